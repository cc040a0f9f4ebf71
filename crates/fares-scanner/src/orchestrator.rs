//! Extraction orchestrator for coordinating a date-range run.
//!
//! This module provides the `ExtractionOrchestrator` which walks the
//! configured dates, scrapes each one with retry logic, and assembles the
//! batches into an [`ExtractionRun`]. A query that keeps failing is recorded
//! as an "extraction failed" batch; it never aborts the run.

use crate::error::{Result, ScanError};
use crate::scraper::FlightPageScraper;
use chrono::{NaiveDate, Utc};
use fares_browser::{BrowserSession, SessionFactory};
use fares_core::{ExtractionBatch, ExtractionPlan, ExtractionRun, RetryConfig, SearchQuery};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Default number of concurrent workers.
const DEFAULT_WORKERS: usize = 1;

/// Lifecycle of one query within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryState {
    /// Not started yet
    Pending,
    /// An attempt is running
    InProgress,
    /// Scraped successfully
    Completed,
    /// Gave up; recorded as "extraction failed"
    Failed,
    /// Waiting out the backoff before the next attempt
    RetryScheduled,
}

impl QueryState {
    /// Whether `next` is a legal successor of this state.
    #[must_use]
    pub fn can_transition_to(self, next: QueryState) -> bool {
        use QueryState::{Completed, Failed, InProgress, Pending, RetryScheduled};
        matches!(
            (self, next),
            (Pending | RetryScheduled, InProgress)
                | (InProgress, Completed | Failed | RetryScheduled)
        )
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(self, next: QueryState) -> Result<QueryState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ScanError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Fixed-count retry policy with linear backoff, stretched after timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per query, including the first
    pub max_attempts: u32,
    /// Delay unit between attempts
    pub base_delay: Duration,
    /// Extra multiplier applied after a timeout
    pub timeout_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            timeout_multiplier: u32::try_from(config.timeout_backoff_multiplier)
                .unwrap_or(u32::MAX)
                .max(1),
        }
    }

    /// Delay before the attempt following `attempt` (1-based) failed with `error`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32, error: &ScanError) -> Duration {
        let multiplier = if error.is_timeout() {
            self.timeout_multiplier
        } else {
            1
        };
        self.base_delay
            .saturating_mul(attempt)
            .saturating_mul(multiplier)
    }
}

/// One observation per finished date, for external logging.
#[derive(Debug, Clone, Serialize)]
pub struct RunProgress {
    /// Worker that handled the date
    pub worker: usize,
    /// Travel date that finished
    pub date: NaiveDate,
    /// Dates finished so far, across workers
    pub completed: usize,
    /// Dates in the run
    pub total: usize,
    /// Offers extracted for the date
    pub offers: usize,
    /// Rows skipped as malformed
    pub skipped_rows: usize,
    /// Attempts spent
    pub attempts: u32,
    /// Final state of the query
    pub state: QueryState,
    /// Empty-with-reason label, if any
    pub reason: Option<String>,
}

/// Tracks one query through its states.
struct QueryTracker {
    query: SearchQuery,
    state: QueryState,
    attempts: u32,
}

impl QueryTracker {
    fn new(query: SearchQuery) -> Self {
        Self {
            query,
            state: QueryState::Pending,
            attempts: 0,
        }
    }

    fn advance(&mut self, next: QueryState) -> Result<()> {
        self.state = self.state.transition(next)?;
        tracing::trace!("{} -> {:?}", self.query, self.state);
        Ok(())
    }
}

/// Orchestrates extraction across a date range.
pub struct ExtractionOrchestrator<F> {
    /// Route and dates to cover
    plan: ExtractionPlan,
    /// Page scraper shared by all workers
    scraper: FlightPageScraper,
    /// Source of isolated browser sessions
    factory: F,
    /// Per-query retry policy
    retry: RetryPolicy,
    /// Concurrent workers, each with its own sessions
    workers: usize,
    /// Pause between consecutive queries of one worker
    query_delay: Duration,
    /// Run-level cancellation signal
    cancel: CancellationToken,
    /// Optional progress listener
    progress: Option<UnboundedSender<RunProgress>>,
}

impl<F> ExtractionOrchestrator<F>
where
    F: SessionFactory,
{
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(plan: ExtractionPlan, scraper: FlightPageScraper, factory: F) -> Self {
        Self {
            plan,
            scraper,
            factory,
            retry: RetryPolicy::default(),
            workers: DEFAULT_WORKERS,
            query_delay: Duration::ZERO,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Set the per-query retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the number of concurrent workers.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Pause between consecutive queries of a worker.
    #[must_use]
    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Send a [`RunProgress`] for every finished date.
    #[must_use]
    pub fn with_progress(mut self, progress: UnboundedSender<RunProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Token that stops the run between dates when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Give back the session factory, e.g. to shut the browser down.
    pub fn into_factory(self) -> F {
        self.factory
    }

    /// Execute the run.
    ///
    /// Every date yields exactly one batch unless the run is cancelled, in
    /// which case the batches gathered so far are returned with
    /// `cancelled = true`. Only invalid plans fail, before any scraping.
    pub async fn run(&self) -> Result<ExtractionRun> {
        let started_at = Utc::now();
        let queries = self
            .plan
            .dates
            .iter()
            .map(|date| {
                SearchQuery::new(
                    self.plan.origin.clone(),
                    self.plan.destination.clone(),
                    date,
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total = queries.len();
        let workers = self.workers.min(total).max(1);
        let completed = AtomicUsize::new(0);

        tracing::info!(
            "Starting extraction {} ({}) -> {} ({}): {} dates, {} worker(s)",
            self.plan.origin,
            self.plan.origin_name,
            self.plan.destination,
            self.plan.destination_name,
            total,
            workers
        );

        let mut subsets: Vec<Vec<SearchQuery>> = vec![Vec::new(); workers];
        for (index, query) in queries.into_iter().enumerate() {
            subsets[index % workers].push(query);
        }

        let outputs = futures::future::join_all(
            subsets
                .into_iter()
                .enumerate()
                .map(|(worker, queries)| self.run_worker(worker, queries, &completed, total)),
        )
        .await;

        let mut batches = Vec::with_capacity(total);
        let mut cancelled = false;
        for (worker_batches, worker_cancelled) in outputs {
            batches.extend(worker_batches);
            cancelled |= worker_cancelled;
        }

        let run = ExtractionRun::new(started_at, batches, cancelled);
        tracing::info!(
            "Extraction finished: {} batches, {} offers, {} failed{}",
            run.len(),
            run.offer_count(),
            run.failed_count(),
            if run.cancelled { " (cancelled)" } else { "" }
        );
        Ok(run)
    }

    /// Process a subset of queries sequentially, returning its batches and
    /// whether it stopped on cancellation.
    async fn run_worker(
        &self,
        worker: usize,
        queries: Vec<SearchQuery>,
        completed: &AtomicUsize,
        total: usize,
    ) -> (Vec<ExtractionBatch>, bool) {
        let mut batches = Vec::with_capacity(queries.len());
        let mut warmed_up = false;

        for (index, query) in queries.into_iter().enumerate() {
            if index > 0 && !self.query_delay.is_zero() {
                tokio::select! {
                    () = self.cancel.cancelled() => {}
                    () = tokio::time::sleep(self.query_delay) => {}
                }
            }
            if self.cancel.is_cancelled() {
                tracing::info!(
                    "Worker {} cancelled before {}; keeping {} batches",
                    worker,
                    query.date(),
                    batches.len()
                );
                return (batches, true);
            }

            let (batch, state) = self.process_query(query, &mut warmed_up).await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            self.report(worker, &batch, state, done, total);
            batches.push(batch);
        }

        (batches, false)
    }

    /// Run one query to a terminal state. Never fails: exhausted or
    /// non-retryable errors become an "extraction failed" batch.
    async fn process_query(
        &self,
        query: SearchQuery,
        warmed_up: &mut bool,
    ) -> (ExtractionBatch, QueryState) {
        let mut tracker = QueryTracker::new(query);
        match self.drive_query(&mut tracker, warmed_up).await {
            Ok(batch) => (batch, tracker.state),
            Err(e) => {
                tracing::error!("Query {} aborted: {}", tracker.query, e);
                (
                    ExtractionBatch::failed(tracker.query.clone(), e.to_string())
                        .with_attempts(tracker.attempts),
                    QueryState::Failed,
                )
            }
        }
    }

    async fn drive_query(
        &self,
        tracker: &mut QueryTracker,
        warmed_up: &mut bool,
    ) -> Result<ExtractionBatch> {
        tracker.advance(QueryState::InProgress)?;

        loop {
            tracker.attempts += 1;
            let attempt = tracker.attempts;

            match self.attempt(&tracker.query, warmed_up).await {
                Ok(batch) => {
                    tracker.advance(QueryState::Completed)?;
                    return Ok(batch.with_attempts(attempt));
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    tracker.advance(QueryState::RetryScheduled)?;
                    let delay = self.retry.delay_after(attempt, &e);
                    tracing::warn!(
                        "Scrape failed for {} (attempt {}/{}), retrying in {:?}: {}",
                        tracker.query,
                        attempt,
                        self.retry.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    tracker.advance(QueryState::InProgress)?;
                }
                Err(e) => {
                    tracker.advance(QueryState::Failed)?;
                    tracing::error!(
                        "Giving up on {} after {} attempt(s): {}",
                        tracker.query,
                        attempt,
                        e
                    );
                    return Ok(
                        ExtractionBatch::failed(tracker.query.clone(), e.to_string())
                            .with_attempts(attempt),
                    );
                }
            }
        }
    }

    /// One attempt on a fresh session, which is closed on every path. A
    /// worker warms up on its first session; a failed warm-up is repeated on
    /// the next attempt.
    async fn attempt(
        &self,
        query: &SearchQuery,
        warmed_up: &mut bool,
    ) -> Result<ExtractionBatch> {
        let mut session = self.factory.open_session().await?;
        let outcome = self.warm_up_then_scrape(&mut session, query, warmed_up).await;
        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close session for {}: {}", query, e);
        }
        outcome
    }

    async fn warm_up_then_scrape(
        &self,
        session: &mut F::Session,
        query: &SearchQuery,
        warmed_up: &mut bool,
    ) -> Result<ExtractionBatch> {
        if !*warmed_up {
            self.scraper.warm_up(session).await?;
            *warmed_up = true;
        }
        self.scraper.scrape(session, query).await
    }

    fn report(
        &self,
        worker: usize,
        batch: &ExtractionBatch,
        state: QueryState,
        completed: usize,
        total: usize,
    ) {
        let progress = RunProgress {
            worker,
            date: batch.query.date(),
            completed,
            total,
            offers: batch.offers().len(),
            skipped_rows: batch.skipped_rows,
            attempts: batch.attempts,
            state,
            reason: batch.empty_reason().map(|r| r.label().to_string()),
        };

        tracing::info!(
            "[{}/{}] {}: {} offers, {} skipped, {} attempt(s){}",
            progress.completed,
            progress.total,
            progress.date,
            progress.offers,
            progress.skipped_rows,
            progress.attempts,
            progress
                .reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default()
        );

        if let Some(sender) = &self.progress {
            // A listener that went away must not stop the run
            let _ = sender.send(progress);
        }
    }
}
