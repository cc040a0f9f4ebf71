//! Fares Core - Foundation crate for the fares extractor.
//!
//! This crate provides the data model, date range generation, configuration
//! and core error types that the browser, scanner and sink crates share.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`dates`] - Restartable calendar date ranges
//! - [`types`] - Queries, offers, batches and runs
//!
//! # Example
//!
//! ```rust
//! use fares_core::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let plan = config.extraction_plan()?;
//! for date in plan.dates.iter() {
//!     println!("{} -> {} on {date}", plan.origin, plan.destination);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
#[allow(missing_docs)]
pub mod dates;
pub mod error;
#[allow(missing_docs)]
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DatesConfig, ExtractionPlan, GeneralConfig, OutputConfig,
    RetryConfig, RouteConfig, ScanningConfig, SelectorConfig,
};
pub use dates::{DateRange, Inclusivity};
pub use error::{ConfigError, ConfigResult, FaresError, Result};
pub use types::{
    AirportCode, BatchOutcome, CabinClass, EmptyReason, ExtractionBatch, ExtractionRun,
    FlightOffer, Money, SearchQuery,
};
