use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    Chromium(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timed out after {timeout:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: String,
        timeout: Duration,
    },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("session already closed")]
    SessionClosed,
}

impl BrowserError {
    /// Whether the error came from an expired wait rather than a failed load.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::Navigation("HTTP 503 for https://example.com".to_string());
        assert_eq!(
            err.to_string(),
            "navigation failed: HTTP 503 for https://example.com"
        );
    }

    #[test]
    fn test_timeout_is_distinguished() {
        let err = BrowserError::Timeout {
            waiting_for: "ol.results".to_string(),
            timeout: Duration::from_secs(15),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("ol.results"));
        assert!(!BrowserError::Navigation("refused".to_string()).is_timeout());
    }
}
