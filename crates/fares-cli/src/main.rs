//! `fares` - extract LATAM one-way fares for a date range.
//!
//! Usage: `fares [CONFIG_PATH]`. Without a path the XDG config file is used
//! when present, otherwise defaults. `FARES_*` environment variables override
//! either.

use anyhow::Context;
use fares_browser::{ChromeEngine, SessionSettings};
use fares_core::AppConfig;
use fares_scanner::{ExtractionOrchestrator, FlightPageScraper, RetryPolicy};
use fares_sink::{LocalDirUploader, OutputSink};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// Initialize tracing subscriber for logging
fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

fn session_settings(config: &AppConfig) -> SessionSettings {
    SessionSettings {
        headless: config.browser.headless,
        window_width: config.browser.window_width,
        window_height: config.browser.window_height,
        navigation_timeout: Duration::from_secs(config.browser.navigation_timeout_secs),
        nav_retries: config.browser.nav_retries,
        nav_backoff_base: Duration::from_millis(config.browser.nav_backoff_base_ms),
        ..SessionSettings::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load_with_env(config_path.as_deref())
        .context("failed to load configuration")?;

    init_tracing(&config.general.log_level);
    info!("Starting fares v{}", env!("CARGO_PKG_VERSION"));

    let plan = config
        .extraction_plan()
        .context("invalid extraction settings")?;
    let scraper = FlightPageScraper::from_config(&config).context("invalid selectors")?;

    let engine = ChromeEngine::launch(session_settings(&config))
        .await
        .context("failed to launch browser")?;

    let orchestrator = ExtractionOrchestrator::new(plan, scraper, engine)
        .with_retry_policy(RetryPolicy::from_config(&config.retry))
        .with_workers(config.scanning.workers)
        .with_query_delay(Duration::from_millis(config.scanning.delay_between_queries_ms));

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current date");
            cancel.cancel();
        }
    });

    let outcome = orchestrator.run().await;
    if let Err(e) = orchestrator.into_factory().shutdown().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }
    let run = outcome.context("extraction run failed")?;

    let sink = OutputSink::from_config(
        &config.output,
        LocalDirUploader::new(config.output.destination_root.clone()),
    );
    let report = sink.flush(&run).await;

    info!(
        "Run {} finished: {} dates, {} offers, {} failed, {} artifacts uploaded, {} dates skipped{}",
        run.run_id,
        run.len(),
        run.offer_count(),
        run.failed_count(),
        report.uploaded.len(),
        report.skipped.len(),
        if run.cancelled { ", cancelled" } else { "" }
    );

    if !report.is_complete() {
        for (date, e) in &report.failures {
            error!("Artifact for {} was not stored: {}", date, e);
        }
        anyhow::bail!("{} date(s) could not be stored", report.failures.len());
    }

    Ok(())
}
