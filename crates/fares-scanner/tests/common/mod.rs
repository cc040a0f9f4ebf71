//! Scripted stand-in for the flight search site.

#![allow(dead_code)]

use chrono::NaiveDate;
use fares_browser::{BrowserError, BrowserSession, SessionFactory};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What the site does for one attempt at a date.
#[derive(Debug, Clone)]
pub enum Behavior {
    Rows(Vec<String>),
    NoFlights,
    Timeout,
    NavigationError,
}

#[derive(Default)]
struct SiteState {
    scripts: Mutex<HashMap<NaiveDate, VecDeque<Behavior>>>,
    urls: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    cancel_after_closes: Mutex<Option<(usize, CancellationToken)>>,
}

/// Factory handing out sessions against a shared script. Clones share state.
#[derive(Clone, Default)]
pub struct FakeSite {
    state: Arc<SiteState>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue behaviors for `date`. The last one repeats once the queue drains.
    pub fn script(&self, date: NaiveDate, behaviors: Vec<Behavior>) -> &Self {
        self.state
            .scripts
            .lock()
            .unwrap()
            .insert(date, behaviors.into());
        self
    }

    /// Cancel `token` once `closes` sessions have been closed.
    pub fn cancel_after(&self, closes: usize, token: CancellationToken) {
        *self.state.cancel_after_closes.lock().unwrap() = Some((closes, token));
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.state.urls.lock().unwrap().clone()
    }

    fn next_behavior(&self, date: NaiveDate) -> Behavior {
        let mut scripts = self.state.scripts.lock().unwrap();
        match scripts.get_mut(&date) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Behavior::NoFlights),
            None => Behavior::NoFlights,
        }
    }
}

#[async_trait::async_trait]
impl SessionFactory for FakeSite {
    type Session = FakeSession;

    async fn open_session(&self) -> fares_browser::Result<FakeSession> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            site: self.clone(),
            current: None,
            closed: false,
        })
    }
}

pub struct FakeSession {
    site: FakeSite,
    current: Option<Behavior>,
    closed: bool,
}

fn outbound_date(url: &str) -> Option<NaiveDate> {
    let url = url::Url::parse(url).ok()?;
    let (_, value) = url.query_pairs().find(|(k, _)| k == "outbound")?;
    NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok()
}

#[async_trait::async_trait]
impl BrowserSession for FakeSession {
    async fn open(&mut self, url: &str) -> fares_browser::Result<()> {
        if self.closed {
            return Err(BrowserError::SessionClosed);
        }
        self.site.state.urls.lock().unwrap().push(url.to_string());

        let Some(date) = outbound_date(url) else {
            return Ok(());
        };
        match self.site.next_behavior(date) {
            Behavior::NavigationError => {
                Err(BrowserError::Navigation(format!("HTTP 503 for {url}")))
            }
            behavior => {
                self.current = Some(behavior);
                Ok(())
            }
        }
    }

    async fn wait_for_any(
        &self,
        selectors: &[&str],
        timeout: Duration,
    ) -> fares_browser::Result<usize> {
        match &self.current {
            Some(Behavior::Rows(_)) => Ok(0),
            Some(Behavior::NoFlights) => Ok(1),
            _ => Err(BrowserError::Timeout {
                waiting_for: selectors.join(" | "),
                timeout,
            }),
        }
    }

    async fn click_if_present(
        &self,
        _selector: &str,
        _timeout: Duration,
    ) -> fares_browser::Result<bool> {
        Ok(false)
    }

    async fn extract_text(&self, _selector: &str) -> fares_browser::Result<Option<String>> {
        Ok(None)
    }

    async fn extract_all(&self, _selector: &str) -> fares_browser::Result<Vec<String>> {
        match &self.current {
            Some(Behavior::Rows(rows)) => Ok(rows.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn close(&mut self) -> fares_browser::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let closed = self.site.state.closed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = self.site.state.cancel_after_closes.lock().unwrap().as_ref() {
            if closed >= *after {
                token.cancel();
            }
        }
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// A result card in the markup the default selectors expect.
pub fn card(number: &str, dep: &str, arr: &str, duration: &str, price: &str) -> String {
    format!(
        r#"<li class="bodyFlightsstyle__ListItemAvailableFlights-sc__sc-1g00tx2-5">
            <span data-testid="flight-info-0-flight-number">{number}</span>
            <div data-testid="flight-info-0-origin">
                <span class="TextHourFlight-sc">{dep}</span><span class="TextIATA-sc">GRU</span>
            </div>
            <div data-testid="flight-info-0-duration"><span class="Duration-sc">{duration}</span></div>
            <div data-testid="flight-info-0-destination">
                <span class="TextHourFlight-sc">{arr}</span><span class="TextIATA-sc">BPS</span>
            </div>
            <div data-testid="flight-info-0-amount"><span class="CurrencyAmount-sc">{price}</span></div>
            <div class="flightOperatorsstyles__OperatorName-sc__sc-ob3tfo-6">LATAM Airlines Brasil</div>
        </li>"#
    )
}

/// Two well-formed offers.
pub fn two_offers() -> Behavior {
    Behavior::Rows(vec![
        card("LA3350", "06:05", "07:50", "1 h 45 min.", "R$ 459,90"),
        card("LA3352", "20:15", "5:40 +1", "9 h 25 min.", "R$ 1.234,56"),
    ])
}
