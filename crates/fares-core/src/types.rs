//! Data model shared by the scraper, orchestrator and output sink.
//!
//! Values here are plain data: a query names one route on one day, an offer
//! is one priced result, a batch ties the offers (or the reason there are
//! none) to the query that produced them, and a run is every batch of one
//! extraction.

use crate::error::FaresError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

/// IATA airport code, three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AirportCode(String);

impl AirportCode {
    /// Create a new `AirportCode`; input is upper-cased before validation.
    ///
    /// # Errors
    /// Returns error if the code is not exactly three ASCII letters.
    pub fn new(code: impl AsRef<str>) -> Result<Self, FaresError> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> Result<(), FaresError> {
        static IATA_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = IATA_REGEX.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("valid regex"));

        if regex.is_match(code) {
            Ok(())
        } else {
            Err(FaresError::Validation(format!(
                "invalid airport code: must be three letters, got '{code}'"
            )))
        }
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AirportCode {
    type Error = FaresError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AirportCode> for String {
    fn from(code: AirportCode) -> Self {
        code.0
    }
}

/// One route on one travel day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSearchQuery")]
pub struct SearchQuery {
    origin: AirportCode,
    destination: AirportCode,
    date: NaiveDate,
}

impl SearchQuery {
    /// Create a query for `origin` → `destination` on `date`.
    ///
    /// # Errors
    /// Returns error if origin and destination are the same airport.
    pub fn new(
        origin: AirportCode,
        destination: AirportCode,
        date: NaiveDate,
    ) -> Result<Self, FaresError> {
        if origin == destination {
            return Err(FaresError::Validation(format!(
                "origin and destination must differ, both are {origin}"
            )));
        }
        Ok(Self {
            origin,
            destination,
            date,
        })
    }

    #[must_use]
    pub fn origin(&self) -> &AirportCode {
        &self.origin
    }

    #[must_use]
    pub fn destination(&self) -> &AirportCode {
        &self.destination
    }

    /// Travel date.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

#[derive(Deserialize)]
struct RawSearchQuery {
    origin: AirportCode,
    destination: AirportCode,
    date: NaiveDate,
}

impl TryFrom<RawSearchQuery> for SearchQuery {
    type Error = FaresError;

    fn try_from(raw: RawSearchQuery) -> Result<Self, Self::Error> {
        Self::new(raw.origin, raw.destination, raw.date)
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} on {}", self.origin, self.destination, self.date)
    }
}

/// Cabin class requested in the search and reported on each offer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CabinClass {
    /// Standard economy
    #[default]
    Economy,
    /// Premium economy
    PremiumEconomy,
    /// Business / premium business
    Business,
}

impl CabinClass {
    /// Name used in search URLs and output files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Economy => "Economy",
            Self::PremiumEconomy => "PremiumEconomy",
            Self::Business => "Business",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CabinClass {
    type Err = FaresError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
            "economy" => Ok(Self::Economy),
            "premiumeconomy" => Ok(Self::PremiumEconomy),
            "business" => Ok(Self::Business),
            other => Err(FaresError::Validation(format!("unknown cabin class '{other}'"))),
        }
    }
}

/// A non-negative price in minor units (cents) with its ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_cents: u64,
    currency: String,
}

impl Money {
    #[must_use]
    pub fn new(amount_cents: u64, currency: impl Into<String>) -> Self {
        Self {
            amount_cents,
            currency: currency.into(),
        }
    }

    /// Parse a plain decimal amount such as `1234.56` or `980`.
    ///
    /// # Errors
    /// Returns error for negative values, more than two fractional digits or
    /// any non-digit content.
    pub fn from_decimal_str(amount: &str, currency: impl Into<String>) -> Result<Self, FaresError> {
        let invalid = || FaresError::Validation(format!("invalid price amount '{amount}'"));
        let (whole, frac) = match amount.trim().split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (amount.trim(), ""),
        };

        if whole.is_empty()
            || frac.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        let amount_cents = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(cents))
            .ok_or_else(invalid)?;

        Ok(Self::new(amount_cents, currency))
    }

    #[must_use]
    pub fn amount_cents(&self) -> u64 {
        self.amount_cents
    }

    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Amount formatted with two decimals and a `.` separator.
    #[must_use]
    pub fn amount_string(&self) -> String {
        format!("{}.{:02}", self.amount_cents / 100, self.amount_cents % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency, self.amount_string())
    }
}

/// One priced flight result.
///
/// Origin and destination are not stored here; they belong to the
/// [`SearchQuery`] of the batch that owns the offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFlightOffer")]
pub struct FlightOffer {
    flight_number: String,
    operator: Option<String>,
    departure: NaiveDateTime,
    arrival: NaiveDateTime,
    duration_minutes: u32,
    price: Money,
    cabin: CabinClass,
    available: bool,
}

impl FlightOffer {
    /// Create an offer, checking the schedule invariants.
    ///
    /// # Errors
    /// Returns error if the flight number is blank, arrival does not follow
    /// departure, or arrival lands later than the day after departure.
    pub fn new(
        flight_number: impl Into<String>,
        departure: NaiveDateTime,
        arrival: NaiveDateTime,
        duration_minutes: u32,
        price: Money,
        cabin: CabinClass,
        available: bool,
    ) -> Result<Self, FaresError> {
        let flight_number = flight_number.into().trim().to_string();
        if flight_number.is_empty() {
            return Err(FaresError::Validation("flight number is empty".to_string()));
        }
        if arrival <= departure {
            return Err(FaresError::Validation(format!(
                "arrival {arrival} does not follow departure {departure}"
            )));
        }
        let day_offset = (arrival.date() - departure.date()).num_days();
        if day_offset > 1 {
            return Err(FaresError::Validation(format!(
                "arrival {arrival} is {day_offset} days after departure"
            )));
        }

        Ok(Self {
            flight_number,
            operator: None,
            departure,
            arrival,
            duration_minutes,
            price,
            cabin,
            available,
        })
    }

    /// Attach the operating carrier name.
    #[must_use]
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        let operator = operator.into();
        self.operator = (!operator.trim().is_empty()).then(|| operator.trim().to_string());
        self
    }

    #[must_use]
    pub fn flight_number(&self) -> &str {
        &self.flight_number
    }

    #[must_use]
    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    #[must_use]
    pub fn departure(&self) -> NaiveDateTime {
        self.departure
    }

    #[must_use]
    pub fn arrival(&self) -> NaiveDateTime {
        self.arrival
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn price(&self) -> &Money {
        &self.price
    }

    #[must_use]
    pub fn cabin(&self) -> CabinClass {
        self.cabin
    }

    /// Whether seats can still be booked for this offer.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }
}

#[derive(Deserialize)]
struct RawFlightOffer {
    flight_number: String,
    #[serde(default)]
    operator: Option<String>,
    departure: NaiveDateTime,
    arrival: NaiveDateTime,
    duration_minutes: u32,
    price: Money,
    cabin: CabinClass,
    available: bool,
}

impl TryFrom<RawFlightOffer> for FlightOffer {
    type Error = FaresError;

    fn try_from(raw: RawFlightOffer) -> Result<Self, Self::Error> {
        let offer = Self::new(
            raw.flight_number,
            raw.departure,
            raw.arrival,
            raw.duration_minutes,
            raw.price,
            raw.cabin,
            raw.available,
        )?;
        Ok(match raw.operator {
            Some(operator) => offer.with_operator(operator),
            None => offer,
        })
    }
}

/// Why a batch carries no offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmptyReason {
    /// The site reported no flights for the query.
    NoFlights,
    /// The page could not be scraped.
    ExtractionFailed {
        /// Last error observed
        detail: String,
    },
}

impl EmptyReason {
    /// Short reason label recorded alongside the batch.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoFlights => "no flights",
            Self::ExtractionFailed { .. } => "extraction failed",
        }
    }
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFlights => f.write_str(self.label()),
            Self::ExtractionFailed { detail } => write!(f, "{}: {detail}", self.label()),
        }
    }
}

/// Offers found for a query, or the tagged reason there are none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// At least one offer was extracted.
    Offers(Vec<FlightOffer>),
    /// No offers, with the reason.
    Empty(EmptyReason),
}

/// Result of one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    /// Query the batch answers
    pub query: SearchQuery,
    /// When extraction finished
    pub extracted_at: DateTime<Utc>,
    /// Offers or empty-with-reason
    pub outcome: BatchOutcome,
    /// Result rows that could not be parsed and were skipped
    pub skipped_rows: usize,
    /// Number of attempts spent on the query
    pub attempts: u32,
}

impl ExtractionBatch {
    /// Batch holding the given offers; an empty list becomes a "no flights" batch.
    #[must_use]
    pub fn with_offers(query: SearchQuery, offers: Vec<FlightOffer>, skipped_rows: usize) -> Self {
        let outcome = if offers.is_empty() {
            BatchOutcome::Empty(EmptyReason::NoFlights)
        } else {
            BatchOutcome::Offers(offers)
        };
        Self {
            query,
            extracted_at: Utc::now(),
            outcome,
            skipped_rows,
            attempts: 1,
        }
    }

    #[must_use]
    pub fn no_flights(query: SearchQuery) -> Self {
        Self::with_offers(query, Vec::new(), 0)
    }

    #[must_use]
    pub fn failed(query: SearchQuery, detail: impl Into<String>) -> Self {
        Self {
            query,
            extracted_at: Utc::now(),
            outcome: BatchOutcome::Empty(EmptyReason::ExtractionFailed {
                detail: detail.into(),
            }),
            skipped_rows: 0,
            attempts: 1,
        }
    }

    /// Record how many attempts the query took.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_skipped_rows(mut self, skipped_rows: usize) -> Self {
        self.skipped_rows = skipped_rows;
        self
    }

    /// Offers in page order; empty for empty-with-reason batches.
    #[must_use]
    pub fn offers(&self) -> &[FlightOffer] {
        match &self.outcome {
            BatchOutcome::Offers(offers) => offers,
            BatchOutcome::Empty(_) => &[],
        }
    }

    #[must_use]
    pub fn empty_reason(&self) -> Option<&EmptyReason> {
        match &self.outcome {
            BatchOutcome::Offers(_) => None,
            BatchOutcome::Empty(reason) => Some(reason),
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(
            self.outcome,
            BatchOutcome::Empty(EmptyReason::ExtractionFailed { .. })
        )
    }
}

/// Every batch of one extraction, ordered by travel date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRun {
    /// Unique run identifier
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Whether the run stopped early on a cancellation request
    pub cancelled: bool,
    /// Batches ordered by travel date
    pub batches: Vec<ExtractionBatch>,
}

impl ExtractionRun {
    /// Assemble a finished run; batches are sorted by travel date.
    #[must_use]
    pub fn new(
        started_at: DateTime<Utc>,
        mut batches: Vec<ExtractionBatch>,
        cancelled: bool,
    ) -> Self {
        batches.sort_by_key(|b| b.query.date());
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            cancelled,
            batches,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total number of offers across all batches.
    #[must_use]
    pub fn offer_count(&self) -> usize {
        self.batches.iter().map(|b| b.offers().len()).sum()
    }

    /// Number of batches recorded as extraction failures.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.batches.iter().filter(|b| b.is_failed()).count()
    }

    /// Batches for a single travel date.
    pub fn batches_for(&self, date: NaiveDate) -> impl Iterator<Item = &ExtractionBatch> {
        self.batches.iter().filter(move |b| b.query.date() == date)
    }
}
