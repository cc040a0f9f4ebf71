use crate::actions::SessionFactory;
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use crate::session::ChromeSession;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use futures_util::stream::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Launch and navigation settings for Chromium sessions.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Run without a visible window
    pub headless: bool,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    /// Upper bound for a single navigation
    pub navigation_timeout: Duration,
    /// Navigation attempts before giving up
    pub nav_retries: u32,
    /// First backoff delay, doubled after each failed attempt
    pub nav_backoff_base: Duration,
    /// Interval between DOM checks while waiting for selectors
    pub poll_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout: Duration::from_secs(30),
            nav_retries: 3,
            nav_backoff_base: Duration::from_millis(500),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// One Chromium process handing out isolated page sessions.
pub struct ChromeEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    fingerprint: FingerprintConfig,
    settings: SessionSettings,
}

impl ChromeEngine {
    /// Launch Chromium with a randomized fingerprint.
    pub async fn launch(settings: SessionSettings) -> Result<Self> {
        let fingerprint = FingerprintConfig::randomized()
            .with_viewport(settings.window_width, settings.window_height);
        Self::with_fingerprint(settings, fingerprint).await
    }

    /// Launch Chromium with a specific fingerprint.
    pub async fn with_fingerprint(
        settings: SessionSettings,
        fingerprint: FingerprintConfig,
    ) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .request_timeout(settings.navigation_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--lang={}", primary_language(&fingerprint.accept_language)));
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Chromium)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;

        // Drive the CDP connection until the browser goes away
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!(
            headless = settings.headless,
            width = fingerprint.viewport_width,
            height = fingerprint.viewport_height,
            "Launched Chromium"
        );

        Ok(Self {
            browser,
            handler,
            fingerprint,
            settings,
        })
    }

    /// Close the browser process and stop the event handler.
    pub async fn shutdown(mut self) -> Result<()> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Chromium(e.to_string()));
        if closed.is_ok() {
            let _ = self.browser.wait().await;
        }
        self.handler.abort();
        tracing::debug!("Chromium shut down");
        closed
    }
}

#[async_trait::async_trait]
impl SessionFactory for ChromeEngine {
    type Session = ChromeSession;

    async fn open_session(&self) -> Result<Self::Session> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;

        page.set_user_agent(user_agent_override(&self.fingerprint)?)
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;

        Ok(ChromeSession::new(page, self.settings.clone()))
    }
}

/// Network-level override so every request carries the fingerprint's
/// user agent and Accept-Language.
fn user_agent_override(fingerprint: &FingerprintConfig) -> Result<SetUserAgentOverrideParams> {
    SetUserAgentOverrideParams::builder()
        .user_agent(fingerprint.user_agent.clone())
        .accept_language(fingerprint.accept_language.clone())
        .build()
        .map_err(BrowserError::Chromium)
}

fn primary_language(accept_language: &str) -> &str {
    accept_language
        .split([',', ';'])
        .next()
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .unwrap_or("en-US")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_override() {
        let fingerprint = FingerprintConfig::randomized();
        let params = user_agent_override(&fingerprint).expect("build override");
        assert_eq!(params.user_agent, fingerprint.user_agent);
        assert_eq!(
            params.accept_language.as_deref(),
            Some("pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7")
        );
    }

    #[test]
    fn test_primary_language() {
        assert_eq!(primary_language("pt-BR,pt;q=0.9,en;q=0.8"), "pt-BR");
        assert_eq!(primary_language("en-GB"), "en-GB");
        assert_eq!(primary_language(""), "en-US");
    }

    #[test]
    fn test_default_settings_have_bounded_waits() {
        let settings = SessionSettings::default();
        assert!(settings.headless);
        assert!(settings.nav_retries > 0);
        assert!(settings.navigation_timeout > Duration::ZERO);
        assert!(settings.poll_interval < settings.navigation_timeout);
    }
}
