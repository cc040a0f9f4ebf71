//! Fares Sink - per-date artifacts for extraction runs.
//!
//! Serializes the offers of an [`fares_core::ExtractionRun`] into one CSV
//! file per travel date and hands each file to an [`Uploader`]. Dates that
//! failed extraction are left untouched at the destination.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod row;
pub mod sink;
#[allow(missing_docs)]
pub mod uploader;

// Re-export commonly used types
pub use error::{Result, SinkError};
pub use row::{read_rows, write_rows, OfferRow, COLUMNS};
pub use sink::{OutputSink, SinkReport, SkippedDate, UploadedArtifact};
pub use uploader::{LocalDirUploader, Uploader};
