mod common;

use common::{card, date, two_offers, Behavior, FakeSite};
use fares_browser::{BrowserError, SessionFactory};
use fares_core::{AirportCode, AppConfig, EmptyReason, SearchQuery};
use fares_scanner::{FlightPageScraper, ScanError, LATAM_HOME_URL};

fn query() -> SearchQuery {
    SearchQuery::new(
        AirportCode::new("GRU").unwrap(),
        AirportCode::new("BPS").unwrap(),
        date(2025, 7, 3),
    )
    .unwrap()
}

fn scraper() -> FlightPageScraper {
    FlightPageScraper::from_config(&AppConfig::default()).expect("default config builds")
}

#[tokio::test]
async fn test_results_become_offers() {
    let site = FakeSite::new();
    site.script(date(2025, 7, 3), vec![two_offers()]);
    let mut session = site.open_session().await.unwrap();

    let batch = scraper().scrape(&mut session, &query()).await.unwrap();

    assert_eq!(batch.offers().len(), 2);
    assert_eq!(batch.skipped_rows, 0);
    assert_eq!(batch.offers()[0].flight_number(), "LA3350");
    assert!(batch.empty_reason().is_none());
}

#[tokio::test]
async fn test_warm_up_visits_home() {
    let site = FakeSite::new();
    site.script(date(2025, 7, 3), vec![two_offers()]);
    let mut session = site.open_session().await.unwrap();
    let scraper = scraper();

    scraper.warm_up(&mut session).await.unwrap();
    scraper.scrape(&mut session, &query()).await.unwrap();

    let urls = site.urls();
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0], LATAM_HOME_URL);
    assert!(urls[1].contains("outbound=2025-07-03T00%3A00%3A00.000Z"));
}

#[tokio::test]
async fn test_warm_up_can_be_disabled() {
    let mut config = AppConfig::default();
    config.browser.warm_up = false;
    let scraper = FlightPageScraper::from_config(&config).unwrap();

    let site = FakeSite::new();
    let mut session = site.open_session().await.unwrap();
    scraper.warm_up(&mut session).await.unwrap();
    scraper.scrape(&mut session, &query()).await.unwrap();

    let urls = site.urls();
    assert_eq!(urls.len(), 1);
    assert_ne!(urls[0], LATAM_HOME_URL);
}

#[tokio::test]
async fn test_scrape_does_not_warm_up() {
    let site = FakeSite::new();
    let mut session = site.open_session().await.unwrap();

    scraper().scrape(&mut session, &query()).await.unwrap();

    assert!(site.urls().iter().all(|url| url != LATAM_HOME_URL));
}

#[tokio::test]
async fn test_no_results_marker() {
    let site = FakeSite::new();
    site.script(date(2025, 7, 3), vec![Behavior::NoFlights]);
    let mut session = site.open_session().await.unwrap();

    let batch = scraper().scrape(&mut session, &query()).await.unwrap();

    assert!(batch.offers().is_empty());
    assert_eq!(batch.empty_reason(), Some(&EmptyReason::NoFlights));
}

#[tokio::test]
async fn test_rendered_list_without_rows() {
    let site = FakeSite::new();
    site.script(date(2025, 7, 3), vec![Behavior::Rows(Vec::new())]);
    let mut session = site.open_session().await.unwrap();

    let batch = scraper().scrape(&mut session, &query()).await.unwrap();

    assert_eq!(batch.empty_reason(), Some(&EmptyReason::NoFlights));
}

#[tokio::test]
async fn test_page_that_never_settles() {
    let site = FakeSite::new();
    site.script(date(2025, 7, 3), vec![Behavior::Timeout]);
    let mut session = site.open_session().await.unwrap();

    let err = scraper().scrape(&mut session, &query()).await.unwrap_err();

    assert!(matches!(err, ScanError::ResultsTimeout { .. }));
    assert!(err.is_retryable());
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_navigation_failure_is_retryable() {
    let site = FakeSite::new();
    site.script(date(2025, 7, 3), vec![Behavior::NavigationError]);
    let mut session = site.open_session().await.unwrap();

    let err = scraper().scrape(&mut session, &query()).await.unwrap_err();

    assert!(matches!(
        err,
        ScanError::Browser(BrowserError::Navigation(_))
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_partially_malformed_rows() {
    let site = FakeSite::new();
    site.script(
        date(2025, 7, 3),
        vec![Behavior::Rows(vec![
            card("LA3350", "06:05", "07:50", "1 h 45 min.", "R$ 459,90"),
            card("LA3351", "06:05", "07:50", "1 h 45 min.", "a partir de R$ 300"),
        ])],
    );
    let mut session = site.open_session().await.unwrap();

    let batch = scraper().scrape(&mut session, &query()).await.unwrap();

    assert_eq!(batch.offers().len(), 1);
    assert_eq!(batch.skipped_rows, 1);
}

#[tokio::test]
async fn test_all_rows_malformed() {
    let site = FakeSite::new();
    site.script(
        date(2025, 7, 3),
        vec![Behavior::Rows(vec![
            "<li>no fields</li>".to_string(),
            "<li>still nothing</li>".to_string(),
        ])],
    );
    let mut session = site.open_session().await.unwrap();

    let batch = scraper().scrape(&mut session, &query()).await.unwrap();

    assert!(batch.is_failed());
    assert_eq!(batch.skipped_rows, 2);
    assert!(matches!(
        batch.empty_reason(),
        Some(EmptyReason::ExtractionFailed { .. })
    ));
}
