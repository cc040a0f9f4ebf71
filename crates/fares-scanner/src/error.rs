use crate::orchestrator::QueryState;
use fares_browser::BrowserError;
use fares_core::FaresError;
use std::time::Duration;
use thiserror::Error;

/// Query-level failures.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("neither results nor the no-results marker appeared for {query} within {timeout:?}")]
    ResultsTimeout { query: String, timeout: Duration },

    #[error("invalid query state transition {from:?} -> {to:?}")]
    InvalidTransition { from: QueryState, to: QueryState },

    #[error("invalid result selector {selector}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Core error: {0}")]
    Core(#[from] FaresError),
}

impl ScanError {
    /// Whether another attempt at the same query may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ResultsTimeout { .. } => true,
            Self::Browser(e) => matches!(
                e,
                BrowserError::Navigation(_) | BrowserError::Timeout { .. }
            ),
            _ => false,
        }
    }

    /// Timeouts get a longer backoff than navigation failures.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ResultsTimeout { .. } => true,
            Self::Browser(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Why a single result row could not become an offer. Row errors are
/// absorbed and counted, never fatal to the batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid time '{0}'")]
    InvalidTime(String),

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("invalid price '{0}'")]
    InvalidPrice(String),

    #[error("offer rejected: {0}")]
    InvalidOffer(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
