use crate::error::{BrowserError, Result};
use std::time::Duration;

/// One automated browser context driving a single page.
///
/// Every wait carries an explicit timeout. Methods that take `&mut self`
/// change what the page shows, so a session can only be driven by one
/// flow at a time.
#[async_trait::async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to a URL, retrying transient failures with backoff.
    async fn open(&mut self, url: &str) -> Result<()>;

    /// Wait until `selector` matches an element.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.wait_for_any(&[selector], timeout).await.map(|_| ())
    }

    /// Wait until any of `selectors` matches and return the index of the one
    /// observed first.
    async fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Result<usize>;

    /// Click `selector` if it shows up within `timeout`. Returns whether a
    /// click happened; absence is not an error.
    async fn click_if_present(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Text content of the first match, `None` when nothing matches.
    async fn extract_text(&self, selector: &str) -> Result<Option<String>>;

    /// Outer HTML of every match, empty when nothing matches.
    async fn extract_all(&self, selector: &str) -> Result<Vec<String>>;

    /// Release the page. Calling it more than once is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Source of fresh, isolated browser sessions.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    /// Session type handed out by this factory
    type Session: BrowserSession;

    /// Open a new session with no state carried over from earlier ones.
    async fn open_session(&self) -> Result<Self::Session>;
}

/// Helper to extract the host from a URL, rejecting malformed ones.
pub fn extract_host(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::Navigation(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::Navigation("No host in URL".to_string()))
        .map(|s| s.to_string())
}
