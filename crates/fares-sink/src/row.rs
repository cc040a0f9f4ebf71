//! Flat tabular form of a [`FlightOffer`].

use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use fares_core::{CabinClass, FlightOffer, SearchQuery};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column order of every artifact.
pub const COLUMNS: [&str; 12] = [
    "origin",
    "destination",
    "date",
    "flight_number",
    "departure_time",
    "arrival_time",
    "duration",
    "price_amount",
    "price_currency",
    "cabin_class",
    "availability",
    "operator",
];

/// One offer with its query fields denormalized onto the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRow {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub flight_number: String,
    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
    /// Minutes
    pub duration: u32,
    /// Major units with two decimals, e.g. `1234.56`
    pub price_amount: String,
    pub price_currency: String,
    pub cabin_class: CabinClass,
    pub availability: bool,
    pub operator: Option<String>,
}

impl OfferRow {
    #[must_use]
    pub fn new(query: &SearchQuery, offer: &FlightOffer) -> Self {
        Self {
            origin: query.origin().to_string(),
            destination: query.destination().to_string(),
            date: query.date(),
            flight_number: offer.flight_number().to_string(),
            departure_time: offer.departure(),
            arrival_time: offer.arrival(),
            duration: offer.duration_minutes(),
            price_amount: offer.price().amount_string(),
            price_currency: offer.price().currency().to_string(),
            cabin_class: offer.cabin(),
            availability: offer.is_available(),
            operator: offer.operator().map(str::to_string),
        }
    }
}

/// Write `rows` to `path`, replacing any existing file. The header is always
/// written, so an empty slice yields a header-only file.
pub fn write_rows(path: &Path, rows: &[OfferRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read an artifact back into rows.
pub fn read_rows(path: &Path) -> Result<Vec<OfferRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<OfferRow>, csv::Error>>()
        .map_err(Into::into)
}
