//! Drives one browser session from a [`SearchQuery`] to an [`ExtractionBatch`].

use crate::error::{Result, ScanError};
use crate::parser::OfferParser;
use crate::url_builder::{build_search_url, SearchParams, LATAM_HOME_URL, LATAM_SEARCH_URL};
use fares_browser::BrowserSession;
use fares_core::{AppConfig, ExtractionBatch, SearchQuery};
use std::time::Duration;

/// How long warm-up waits for each banner before moving on.
const DISMISS_TIMEOUT: Duration = Duration::from_secs(5);

/// Page-level settings for [`FlightPageScraper`].
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// Search page URL without query parameters
    pub search_url: String,
    /// Home page visited during warm-up
    pub home_url: String,
    /// Passenger mix and cabin
    pub params: SearchParams,
    /// Marker for a rendered flight list
    pub results_loaded: String,
    /// Marker for the "no flights" state
    pub no_results: String,
    /// One element per flight card
    pub result_row: String,
    /// Upper bound for the result page to reach a terminal state
    pub page_timeout: Duration,
    /// Visit the home page and dismiss banners before searching
    pub warm_up: bool,
    /// Banners and modals closed during warm-up
    pub dismiss: Vec<String>,
    /// Upper bound for each banner to show up
    pub dismiss_timeout: Duration,
}

impl ScraperSettings {
    /// Derive settings from application config.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            search_url: LATAM_SEARCH_URL.to_string(),
            home_url: LATAM_HOME_URL.to_string(),
            params: SearchParams::from_config(config),
            results_loaded: config.selectors.results_loaded.clone(),
            no_results: config.selectors.no_results.clone(),
            result_row: config.selectors.result_row.clone(),
            page_timeout: Duration::from_secs(config.browser.page_timeout_secs),
            warm_up: config.browser.warm_up,
            dismiss: config.selectors.dismiss.clone(),
            dismiss_timeout: DISMISS_TIMEOUT,
        }
    }
}

/// Translates one query into browser interactions and one batch.
pub struct FlightPageScraper {
    settings: ScraperSettings,
    parser: OfferParser,
}

impl FlightPageScraper {
    /// Create a scraper from explicit settings and a compiled parser.
    #[must_use]
    pub fn new(settings: ScraperSettings, parser: OfferParser) -> Self {
        Self { settings, parser }
    }

    /// Build the scraper from application config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            ScraperSettings::from_config(config),
            OfferParser::from_config(config)?,
        ))
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &ScraperSettings {
        &self.settings
    }

    /// Scrape `query` on `session`. Warm-up is separate, see
    /// [`FlightPageScraper::warm_up`].
    ///
    /// Returns a "no flights" batch when the site says so, a populated batch
    /// when rows were parsed, and an "extraction failed" batch when every row
    /// was malformed. Navigation failures and pages that never settle are
    /// returned as retryable errors for the orchestrator to handle.
    pub async fn scrape<S>(&self, session: &mut S, query: &SearchQuery) -> Result<ExtractionBatch>
    where
        S: BrowserSession + ?Sized,
    {
        let url = build_search_url(&self.settings.search_url, query, &self.settings.params)?;

        tracing::debug!("Searching {}: {}", query, url);
        session.open(&url).await?;

        let terminal = [
            self.settings.results_loaded.as_str(),
            self.settings.no_results.as_str(),
        ];
        let observed = match session
            .wait_for_any(&terminal, self.settings.page_timeout)
            .await
        {
            Ok(index) => index,
            Err(e) if e.is_timeout() => {
                return Err(ScanError::ResultsTimeout {
                    query: query.to_string(),
                    timeout: self.settings.page_timeout,
                })
            }
            Err(e) => return Err(e.into()),
        };

        if observed == 1 {
            tracing::info!("No flights for {}", query);
            return Ok(ExtractionBatch::no_flights(query.clone()));
        }

        let rows = session.extract_all(&self.settings.result_row).await?;
        if rows.is_empty() {
            tracing::info!("Result list for {} rendered without rows", query);
            return Ok(ExtractionBatch::no_flights(query.clone()));
        }

        let parsed = self.parser.parse_rows(&rows, query.date());
        if parsed.offers.is_empty() {
            tracing::warn!(
                "All {} result rows for {} were malformed; selectors may be outdated",
                parsed.skipped,
                query
            );
            return Ok(ExtractionBatch::failed(
                query.clone(),
                format!("all {} result rows were malformed", parsed.skipped),
            )
            .with_skipped_rows(parsed.skipped));
        }

        tracing::debug!(
            "Parsed {} offers for {} ({} rows skipped)",
            parsed.offers.len(),
            query,
            parsed.skipped
        );
        Ok(ExtractionBatch::with_offers(
            query.clone(),
            parsed.offers,
            parsed.skipped,
        ))
    }

    /// Visit the home page and dismiss the cookie banner and login modal.
    ///
    /// Dismissals persist in the browser profile, so later sessions of the
    /// same browser can skip this. A no-op when warm-up is disabled.
    pub async fn warm_up<S>(&self, session: &mut S) -> Result<()>
    where
        S: BrowserSession + ?Sized,
    {
        if !self.settings.warm_up {
            return Ok(());
        }
        session.open(&self.settings.home_url).await?;
        for selector in &self.settings.dismiss {
            if session
                .click_if_present(selector, self.settings.dismiss_timeout)
                .await?
            {
                tracing::debug!("Dismissed {}", selector);
            }
        }
        Ok(())
    }
}
