//! Fares Scanner - flight result scraping and run orchestration.
//!
//! This crate turns a route and a range of travel dates into an
//! [`fares_core::ExtractionRun`]. It builds the search URL for each date,
//! drives a browser session until the result list (or the "no flights"
//! marker) settles, parses every result card into a
//! [`fares_core::FlightOffer`], and retries transient failures.
//!
//! # Features
//!
//! - One batch per date, tagged with offers or an empty-with-reason outcome
//! - Fixed-count retries with linear backoff, stretched after timeouts
//! - Malformed result rows skipped and counted, never fatal
//! - Optional parallel workers, each on its own browser sessions
//! - Cooperative cancellation between dates
//!
//! # Example
//!
//! ```rust,ignore
//! use fares_browser::{ChromeEngine, SessionSettings};
//! use fares_core::AppConfig;
//! use fares_scanner::{ExtractionOrchestrator, FlightPageScraper};
//!
//! let config = AppConfig::default();
//! let engine = ChromeEngine::launch(SessionSettings::default()).await?;
//! let orchestrator = ExtractionOrchestrator::new(
//!     config.extraction_plan()?,
//!     FlightPageScraper::from_config(&config)?,
//!     engine,
//! );
//!
//! let run = orchestrator.run().await?;
//! println!("{} offers", run.offer_count());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod orchestrator;
#[allow(missing_docs)]
pub mod parser;
pub mod scraper;
#[allow(missing_docs)]
pub mod url_builder;

// Re-export commonly used types
pub use error::{ParseError, Result, ScanError};
pub use orchestrator::{ExtractionOrchestrator, QueryState, RetryPolicy, RunProgress};
pub use parser::{OfferParser, ParsedRows, PriceFormat};
pub use scraper::{FlightPageScraper, ScraperSettings};
pub use url_builder::{build_search_url, SearchParams, LATAM_HOME_URL, LATAM_SEARCH_URL};
