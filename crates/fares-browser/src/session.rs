//! Chromium-backed [`BrowserSession`].

use crate::actions::{extract_host, BrowserSession};
use crate::engine::SessionSettings;
use crate::error::{BrowserError, Result};
use chromiumoxide::Page;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Reads the HTTP status of the current document, 0 when the browser does not report it.
const NAVIGATION_STATUS_SCRIPT: &str =
    "(() => { const e = performance.getEntriesByType('navigation')[0]; return (e && e.responseStatus) || 0; })()";

/// A single isolated page owned by one worker.
///
/// The page is closed by [`BrowserSession::close`]; if the session is dropped
/// without closing (a failed scrape unwinding, a cancelled task), the page is
/// closed in the background.
pub struct ChromeSession {
    page: Option<Page>,
    settings: SessionSettings,
}

impl ChromeSession {
    pub(crate) fn new(page: Page, settings: SessionSettings) -> Self {
        Self {
            page: Some(page),
            settings,
        }
    }

    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or(BrowserError::SessionClosed)
    }

    async fn navigate_once(&self, url: &str) -> Result<()> {
        let page = self.page()?;
        let timeout = self.settings.navigation_timeout;

        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(BrowserError::Navigation(format!("{url}: {e}"))),
            Err(_) => {
                return Err(BrowserError::Navigation(format!(
                    "{url}: no response within {timeout:?}"
                )))
            }
        }

        let status: i64 = page
            .evaluate(NAVIGATION_STATUS_SCRIPT)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        if status >= 400 {
            return Err(BrowserError::Navigation(format!("HTTP {status} for {url}")));
        }
        Ok(())
    }

    async fn first_match(&self, selectors: &[&str]) -> Result<Option<usize>> {
        let script = first_match_script(selectors)?;
        let index: i64 = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(usize::try_from(index).ok())
    }
}

#[async_trait::async_trait]
impl BrowserSession for ChromeSession {
    async fn open(&mut self, url: &str) -> Result<()> {
        let host = extract_host(url)?;
        let attempts = self.settings.nav_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.navigate_once(url).await {
                Ok(()) => {
                    tracing::debug!(%host, attempt = attempt + 1, "Navigation succeeded");
                    return Ok(());
                }
                Err(e @ BrowserError::Navigation(_)) => {
                    if attempt + 1 < attempts {
                        let delay = backoff_delay(self.settings.nav_backoff_base, attempt);
                        tracing::warn!(
                            "Navigation to {} failed (attempt {}/{}), retrying in {:?}: {}",
                            host,
                            attempt + 1,
                            attempts,
                            delay,
                            e
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| BrowserError::Navigation(url.to_string())))
    }

    async fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Result<usize> {
        let index = poll_first_match(
            || self.first_match(selectors),
            &selectors.join(" | "),
            timeout,
            self.settings.poll_interval,
        )
        .await?;
        tracing::debug!(selector = selectors[index], "Selector resolved");
        Ok(index)
    }

    async fn click_if_present(&self, selector: &str, timeout: Duration) -> Result<bool> {
        match self.wait_for_selector(selector, timeout).await {
            Ok(()) => {}
            Err(BrowserError::Timeout { .. }) => return Ok(false),
            Err(e) => return Err(e),
        }

        let elements = self
            .page()?
            .find_elements(selector)
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;
        let Some(element) = elements.first() else {
            return Ok(false);
        };
        match element.click().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!("Click on {} ignored: {}", selector, e);
                Ok(false)
            }
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<Option<String>> {
        let elements = self
            .page()?
            .find_elements(selector)
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;
        match elements.first() {
            Some(element) => element
                .inner_text()
                .await
                .map(|text| text.map(|t| t.trim().to_string()))
                .map_err(|e| BrowserError::Chromium(e.to_string())),
            None => Ok(None),
        }
    }

    async fn extract_all(&self, selector: &str) -> Result<Vec<String>> {
        let elements = self
            .page()?
            .find_elements(selector)
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;

        let mut fragments = Vec::with_capacity(elements.len());
        for element in &elements {
            if let Some(html) = element
                .outer_html()
                .await
                .map_err(|e| BrowserError::Chromium(e.to_string()))?
            {
                fragments.push(html);
            }
        }
        Ok(fragments)
    }

    async fn close(&mut self) -> Result<()> {
        match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| BrowserError::Chromium(e.to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    let _ = page.close().await;
                });
            }
        }
    }
}

/// Run `check` until it reports a match. Each check is itself bounded by the
/// time left, so a stalled DOM query cannot outlive `timeout`.
async fn poll_first_match<F, Fut>(
    mut check: F,
    waiting_for: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<usize>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<usize>>>,
{
    let deadline = Instant::now() + timeout;
    let expired = || BrowserError::Timeout {
        waiting_for: waiting_for.to_string(),
        timeout,
    };

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, check()).await {
            Ok(Ok(Some(index))) => return Ok(index),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(expired()),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(expired());
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

/// Exponential backoff: `base * 2^attempt`, capped at 64x.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.pow(attempt.min(6))
}

/// One DOM pass returning the index of the first selector that matches, or -1.
fn first_match_script(selectors: &[&str]) -> Result<String> {
    let encoded =
        serde_json::to_string(selectors).map_err(|e| BrowserError::Script(e.to_string()))?;
    Ok(format!(
        "(() => {{ const s = {encoded}; return s.findIndex(q => document.querySelector(q) !== null); }})()"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
        assert_eq!(backoff_delay(base, 40), Duration::from_millis(6400));
    }

    #[tokio::test]
    async fn test_poll_resolves_after_a_few_checks() {
        let mut checks = 0;
        let index = poll_first_match(
            || {
                checks += 1;
                let found = (checks >= 3).then_some(1);
                async move { Ok(found) }
            },
            "a | b",
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .expect("should resolve");
        assert_eq!(index, 1);
        assert_eq!(checks, 3);
    }

    #[tokio::test]
    async fn test_stalled_check_is_cut_at_deadline() {
        let started = std::time::Instant::now();
        let err = poll_first_match(
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Some(0))
            },
            "ol.results",
            Duration::from_millis(50),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_check_errors_propagate() {
        let err = poll_first_match(
            || async { Err(BrowserError::SessionClosed) },
            "ol.results",
            Duration::from_secs(1),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BrowserError::SessionClosed));
    }

    #[test]
    fn test_first_match_script_escapes_selectors() {
        let script = first_match_script(&[r#"ol[aria-label="Voos disponíveis."]"#, "#none"])
            .expect("build script");
        assert!(script.contains(r##"["ol[aria-label=\"Voos disponíveis.\"]","#none"]"##));
        assert!(script.contains("findIndex"));
    }
}
