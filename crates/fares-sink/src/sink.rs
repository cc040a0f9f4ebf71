//! Date-grouped artifact writing and upload.
//!
//! The sink turns an [`ExtractionRun`] into one CSV file per travel date,
//! written under the local work directory and then handed to an
//! [`Uploader`] at a key derived only from the route and date. Re-flushing
//! an unchanged run therefore replaces each artifact with identical content.

use crate::error::Result;
use crate::row::{write_rows, OfferRow};
use crate::uploader::Uploader;
use chrono::NaiveDate;
use fares_core::{ExtractionBatch, ExtractionRun, OutputConfig, SearchQuery};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One artifact that reached the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedArtifact {
    /// Travel date of the group
    pub date: NaiveDate,
    /// Data rows, excluding the header
    pub rows: usize,
    /// File written in the work directory
    pub local_path: PathBuf,
    /// Destination key
    pub key: String,
    /// URI returned by the uploader
    pub uri: String,
}

/// A date left untouched at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDate {
    /// Travel date of the group
    pub date: NaiveDate,
    /// Recorded reason of the last failed batch for the date
    pub reason: String,
    /// Attempts spent on the date across its batches
    pub attempts: u32,
}

/// Outcome of flushing a run. Groups succeed or fail independently.
#[derive(Debug, Default)]
pub struct SinkReport {
    /// Artifacts written and uploaded
    pub uploaded: Vec<UploadedArtifact>,
    /// Dates left untouched because every batch failed extraction
    pub skipped: Vec<SkippedDate>,
    /// Dates whose artifact could not be written or uploaded
    pub failures: Vec<(NaiveDate, crate::SinkError)>,
}

impl SinkReport {
    /// Whether every date group was handled without a sink error.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total data rows uploaded.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.uploaded.iter().map(|a| a.rows).sum()
    }
}

/// Writes per-date artifacts and uploads them.
pub struct OutputSink<U> {
    work_dir: PathBuf,
    key_prefix: String,
    uploader: U,
}

impl<U: Uploader> OutputSink<U> {
    /// Create a sink writing under `work_dir` and uploading below `key_prefix`.
    pub fn new(work_dir: impl Into<PathBuf>, key_prefix: impl Into<String>, uploader: U) -> Self {
        Self {
            work_dir: work_dir.into(),
            key_prefix: key_prefix.into().trim_matches('/').to_string(),
            uploader,
        }
    }

    /// Create a sink from the `[output]` config section.
    pub fn from_config(config: &OutputConfig, uploader: U) -> Self {
        Self::new(config.work_dir.clone(), config.key_prefix.clone(), uploader)
    }

    /// Artifact file name for a query's route and date.
    #[must_use]
    pub fn artifact_name(query: &SearchQuery) -> String {
        format!(
            "latam_{}_{}_{}.csv",
            query.origin(),
            query.destination(),
            query.date().format("%Y-%m-%d")
        )
    }

    /// Destination key for a query's artifact.
    #[must_use]
    pub fn destination_key(&self, query: &SearchQuery) -> String {
        let date = query.date().format("%Y-%m-%d");
        let name = Self::artifact_name(query);
        if self.key_prefix.is_empty() {
            format!("{date}/{name}")
        } else {
            format!("{}/{date}/{name}", self.key_prefix)
        }
    }

    /// Write and upload one artifact per travel date in `run`.
    ///
    /// Failures are collected per date; already uploaded groups stay in place.
    pub async fn flush(&self, run: &ExtractionRun) -> SinkReport {
        let mut groups: BTreeMap<NaiveDate, Vec<&ExtractionBatch>> = BTreeMap::new();
        for batch in &run.batches {
            groups.entry(batch.query.date()).or_default().push(batch);
        }

        let mut report = SinkReport::default();
        for (date, batches) in groups {
            if batches.iter().all(|b| b.is_failed()) {
                let skipped = SkippedDate {
                    date,
                    reason: batches
                        .last()
                        .and_then(|b| b.empty_reason())
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    attempts: batches.iter().map(|b| b.attempts).sum(),
                };
                tracing::warn!(
                    "Not uploading {} ({}), keeping any previous artifact",
                    date,
                    skipped.reason
                );
                report.skipped.push(skipped);
                continue;
            }

            match self.flush_group(date, &batches).await {
                Ok(artifact) => {
                    tracing::info!(
                        "Uploaded {} rows for {} to {}",
                        artifact.rows,
                        date,
                        artifact.uri
                    );
                    report.uploaded.push(artifact);
                }
                Err(e) => {
                    tracing::error!("Failed to flush {}: {}", date, e);
                    report.failures.push((date, e));
                }
            }
        }

        report
    }

    async fn flush_group(
        &self,
        date: NaiveDate,
        batches: &[&ExtractionBatch],
    ) -> Result<UploadedArtifact> {
        let query = &batches[0].query;
        let rows: Vec<OfferRow> = batches
            .iter()
            .flat_map(|b| b.offers().iter().map(|offer| OfferRow::new(&b.query, offer)))
            .collect();

        let dir = self.work_dir.join(date.format("%Y-%m-%d").to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let local_path = dir.join(Self::artifact_name(query));
        write_rows(&local_path, &rows)?;
        tracing::debug!("Wrote {} rows to {}", rows.len(), local_path.display());

        let key = self.destination_key(query);
        let uri = self.uploader.upload(&local_path, &key).await?;

        Ok(UploadedArtifact {
            date,
            rows: rows.len(),
            local_path,
            key,
            uri,
        })
    }
}
