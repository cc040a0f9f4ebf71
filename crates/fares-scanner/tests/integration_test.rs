use fares_browser::{ChromeEngine, SessionSettings};
use fares_core::AppConfig;
use fares_scanner::{ExtractionOrchestrator, FlightPageScraper};

#[tokio::test]
#[ignore = "Requires Chrome browser and network access to the airline site"]
async fn test_live_single_day_run() {
    let mut config = AppConfig::default();
    config.dates.end = config.dates.start;

    let engine = ChromeEngine::launch(SessionSettings::default())
        .await
        .expect("launch browser");
    let orchestrator = ExtractionOrchestrator::new(
        config.extraction_plan().expect("valid plan"),
        FlightPageScraper::from_config(&config).expect("valid selectors"),
        engine,
    );

    let run = orchestrator.run().await.expect("run");

    assert_eq!(run.len(), 1);
    println!(
        "Live run finished: {} offers, empty reason {:?}",
        run.offer_count(),
        run.batches[0].empty_reason()
    );
}
