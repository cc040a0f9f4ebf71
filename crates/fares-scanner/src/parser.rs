use crate::error::{ParseError, ScanError};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use fares_core::{AppConfig, CabinClass, FlightOffer, Money, SelectorConfig};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Locale rules for turning price text into an amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceFormat {
    pub thousands_separator: char,
    pub decimal_separator: char,
    pub default_currency: String,
}

impl Default for PriceFormat {
    fn default() -> Self {
        Self {
            thousands_separator: '.',
            decimal_separator: ',',
            default_currency: "BRL".to_string(),
        }
    }
}

impl PriceFormat {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            thousands_separator: config.scanning.thousands_separator,
            decimal_separator: config.scanning.decimal_separator,
            default_currency: config.scanning.default_currency.clone(),
        }
    }

    /// Parse `R$ 1.234,56` style text. Anything besides a currency marker,
    /// digits and the locale separators (promotional wording such as
    /// "a partir de") makes the price invalid.
    pub fn parse(&self, text: &str) -> Result<Money, ParseError> {
        let invalid = || ParseError::InvalidPrice(text.trim().to_string());
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
            .collect();

        let (currency, number) = self.split_currency(&cleaned);
        if number.is_empty() {
            return Err(invalid());
        }

        let normalized: String = number
            .chars()
            .filter(|c| *c != self.thousands_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();

        Money::from_decimal_str(&normalized, currency).map_err(|_| invalid())
    }

    fn split_currency<'a>(&self, text: &'a str) -> (String, &'a str) {
        const SYMBOLS: [(&str, &str); 6] = [
            ("R$", "BRL"),
            ("US$", "USD"),
            ("BRL", "BRL"),
            ("USD", "USD"),
            ("€", "EUR"),
            ("EUR", "EUR"),
        ];

        for (symbol, code) in SYMBOLS {
            if let Some(rest) = text.strip_prefix(symbol) {
                return (code.to_string(), rest);
            }
        }
        match text.strip_prefix('$') {
            Some(rest) => (self.default_currency.clone(), rest),
            None => (self.default_currency.clone(), text),
        }
    }
}

/// Compiled selectors for the fields inside one result card.
struct RowSelectors {
    departure_time: Selector,
    arrival_time: Selector,
    duration: Selector,
    price: Selector,
    operator: Selector,
    flight_number: Selector,
    sold_out: Selector,
}

/// Offers parsed from a page, plus the number of rows that were skipped.
#[derive(Debug, Default)]
pub struct ParsedRows {
    pub offers: Vec<FlightOffer>,
    pub skipped: usize,
}

/// Turns result-card HTML into [`FlightOffer`] values.
pub struct OfferParser {
    selectors: RowSelectors,
    price_format: PriceFormat,
    cabin: CabinClass,
}

impl OfferParser {
    /// Compile the card selectors once; an unparsable selector is a
    /// configuration error.
    pub fn new(
        selectors: &SelectorConfig,
        price_format: PriceFormat,
        cabin: CabinClass,
    ) -> Result<Self, ScanError> {
        Ok(Self {
            selectors: RowSelectors {
                departure_time: compile(&selectors.departure_time)?,
                arrival_time: compile(&selectors.arrival_time)?,
                duration: compile(&selectors.duration)?,
                price: compile(&selectors.price)?,
                operator: compile(&selectors.operator)?,
                flight_number: compile(&selectors.flight_number)?,
                sold_out: compile(&selectors.sold_out)?,
            },
            price_format,
            cabin,
        })
    }

    /// Build from application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScanError> {
        Self::new(
            &config.selectors,
            PriceFormat::from_config(config),
            config.scanning.cabin,
        )
    }

    /// Parse every row, skipping and counting malformed ones.
    pub fn parse_rows(&self, rows: &[String], date: NaiveDate) -> ParsedRows {
        let mut parsed = ParsedRows::default();
        for (index, row) in rows.iter().enumerate() {
            match self.parse_row(row, date) {
                Ok(offer) => parsed.offers.push(offer),
                Err(e) => {
                    tracing::warn!("Skipping result row {} for {}: {}", index, date, e);
                    parsed.skipped += 1;
                }
            }
        }
        parsed
    }

    /// Parse a single result card.
    pub fn parse_row(&self, html: &str, date: NaiveDate) -> Result<FlightOffer, ParseError> {
        let fragment = Html::parse_fragment(html);
        let root = fragment.root_element();
        let s = &self.selectors;

        let flight_number = text_of(&root, &s.flight_number)
            .map(|n| n.split_whitespace().collect::<String>().to_ascii_uppercase())
            .ok_or(ParseError::MissingField("flight number"))?;

        let departure_text =
            text_of(&root, &s.departure_time).ok_or(ParseError::MissingField("departure time"))?;
        let (departure_time, departure_offset) = parse_clock(&departure_text)?;

        let arrival_text =
            text_of(&root, &s.arrival_time).ok_or(ParseError::MissingField("arrival time"))?;
        let (arrival_time, arrival_offset) = parse_clock(&arrival_text)?;

        let duration_text =
            text_of(&root, &s.duration).ok_or(ParseError::MissingField("duration"))?;
        let duration_minutes = parse_duration_minutes(&duration_text)?;

        let price_text = text_of(&root, &s.price).ok_or(ParseError::MissingField("price"))?;
        let price = self.price_format.parse(&price_text)?;

        let available = root.select(&s.sold_out).next().is_none();

        let departure = at_offset(date, departure_time, departure_offset);
        let arrival = at_offset(date, arrival_time, arrival_offset);

        let offer = FlightOffer::new(
            flight_number,
            departure,
            arrival,
            duration_minutes,
            price,
            self.cabin,
            available,
        )
        .map_err(|e| ParseError::InvalidOffer(e.to_string()))?;

        Ok(match text_of(&root, &s.operator) {
            Some(operator) => offer.with_operator(operator),
            None => offer,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ScanError> {
    Selector::parse(selector).map_err(|e| ScanError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn text_of(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn at_offset(date: NaiveDate, time: NaiveTime, days: i64) -> NaiveDateTime {
    date.and_time(time) + Duration::days(days)
}

/// Largest `+N` suffix a one-way flight can carry.
const MAX_DAY_OFFSET: i64 = 1;

/// Parse `HH:MM` with an optional `+N` day suffix (`5:40+1`, `5:40 +1`).
pub fn parse_clock(text: &str) -> Result<(NaiveTime, i64), ParseError> {
    static TIME_REGEX: OnceLock<Regex> = OnceLock::new();
    static DAYS_REGEX: OnceLock<Regex> = OnceLock::new();
    let time_regex =
        TIME_REGEX.get_or_init(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("valid regex"));
    let days_regex = DAYS_REGEX.get_or_init(|| Regex::new(r"\+\s*(\d+)").expect("valid regex"));

    let invalid = || ParseError::InvalidTime(text.to_string());
    let caps = time_regex.captures(text).ok_or_else(invalid)?;
    let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
    let minute: u32 = caps[2].parse().map_err(|_| invalid())?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)?;

    let days: i64 = match days_regex.captures(text) {
        Some(caps) => caps[1].parse().map_err(|_| invalid())?,
        None => 0,
    };
    if days > MAX_DAY_OFFSET {
        return Err(invalid());
    }
    Ok((time, days))
}

/// Parse `9 h 10 min.` style durations into minutes.
pub fn parse_duration_minutes(text: &str) -> Result<u32, ParseError> {
    static HOURS_REGEX: OnceLock<Regex> = OnceLock::new();
    static MINUTES_REGEX: OnceLock<Regex> = OnceLock::new();
    let hours_regex = HOURS_REGEX.get_or_init(|| Regex::new(r"(\d+)\s*h").expect("valid regex"));
    let minutes_regex =
        MINUTES_REGEX.get_or_init(|| Regex::new(r"(\d+)\s*m").expect("valid regex"));

    let invalid = || ParseError::InvalidDuration(text.to_string());
    let hours = hours_regex.captures(text);
    let minutes = minutes_regex.captures(text);
    if hours.is_none() && minutes.is_none() {
        return Err(invalid());
    }

    let hours: u32 = match hours {
        Some(caps) => caps[1].parse().map_err(|_| invalid())?,
        None => 0,
    };
    let minutes: u32 = match minutes {
        Some(caps) => caps[1].parse().map_err(|_| invalid())?,
        None => 0,
    };
    hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 3).expect("valid date")
    }

    fn parser() -> OfferParser {
        OfferParser::new(
            &SelectorConfig::default(),
            PriceFormat::default(),
            CabinClass::Economy,
        )
        .expect("default selectors compile")
    }

    fn card(number: &str, dep: &str, arr: &str, duration: &str, price: &str) -> String {
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

    #[test]
    fn test_parse_search_results() {
        let rows = vec![
            card("LA 3350", "06:05", "07:50", "1 h 45 min.", "R$ 459,90"),
            card("LA3352", "20:15", "5:40 +1", "9 h 25 min.", "R$ 1.234,56"),
        ];

        let parsed = parser().parse_rows(&rows, date());
        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.offers.len(), 2);

        let first = &parsed.offers[0];
        assert_eq!(first.flight_number(), "LA3350");
        assert_eq!(first.duration_minutes(), 105);
        assert_eq!(first.price().amount_cents(), 45_990);
        assert_eq!(first.price().currency(), "BRL");
        assert_eq!(first.operator(), Some("LATAM Airlines Brasil"));
        assert!(first.is_available());

        let overnight = &parsed.offers[1];
        assert_eq!(overnight.price().amount_cents(), 123_456);
        assert_eq!(
            overnight.arrival(),
            NaiveDate::from_ymd_opt(2025, 7, 4)
                .expect("valid date")
                .and_hms_opt(5, 40, 0)
                .expect("valid time")
        );
    }

    #[test]
    fn test_malformed_rows_are_skipped_and_counted() {
        let rows = vec![
            card("LA3350", "06:05", "07:50", "1 h 45 min.", "R$ 459,90"),
            card("LA3351", "06:05", "07:50", "1 h 45 min.", "a partir de R$ 300"),
            card("LA3352", "bad", "07:50", "1 h 45 min.", "R$ 459,90"),
            "<li>no fields at all</li>".to_string(),
        ];

        let parsed = parser().parse_rows(&rows, date());
        assert_eq!(parsed.offers.len(), 1);
        assert_eq!(parsed.skipped, 3);
    }

    #[test]
    fn test_sold_out_marker() {
        let html = card("LA3350", "06:05", "07:50", "1 h 45 min.", "R$ 459,90").replace(
            "</li>",
            r#"<span data-testid="flight-info-0-sold-out">Esgotado</span></li>"#,
        );
        let offer = parser().parse_row(&html, date()).expect("parse row");
        assert!(!offer.is_available());
    }

    #[test]
    fn test_arrival_before_departure_rejected() {
        let html = card("LA3350", "10:00", "09:00", "1 h", "R$ 100,00");
        let err = parser().parse_row(&html, date()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidOffer(_)));
    }

    #[test]
    fn test_price_normalization() {
        let format = PriceFormat::default();
        assert_eq!(format.parse("R$ 1.234,56").unwrap().amount_cents(), 123_456);
        assert_eq!(format.parse("R$\u{a0}89").unwrap().amount_cents(), 8_900);
        assert_eq!(format.parse("1.000.000,00").unwrap().amount_cents(), 100_000_000);
        assert_eq!(format.parse("US$ 320,10").unwrap().currency(), "USD");
        assert_eq!(format.parse("$ 15").unwrap().currency(), "BRL");
        assert!(format.parse("a partir de R$ 300").is_err());
        assert!(format.parse("from $120").is_err());
        assert!(format.parse("R$").is_err());
        assert!(format.parse("1,234.56").is_err());
    }

    #[test]
    fn test_price_en_us_locale() {
        let format = PriceFormat {
            thousands_separator: ',',
            decimal_separator: '.',
            default_currency: "USD".to_string(),
        };
        let money = format.parse("$1,234.56").unwrap();
        assert_eq!(money.amount_cents(), 123_456);
        assert_eq!(money.currency(), "USD");
    }

    #[test]
    fn test_parse_clock() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).expect("valid time");
        assert_eq!(parse_clock("20:15").unwrap(), (t(20, 15), 0));
        assert_eq!(parse_clock("5:40+1").unwrap(), (t(5, 40), 1));
        assert_eq!(parse_clock("5:40 +1").unwrap(), (t(5, 40), 1));
        assert!(parse_clock("5:40 +2").is_err());
        assert!(parse_clock("25:00").is_err());
        assert!(parse_clock("soon").is_err());
    }

    #[test]
    fn test_huge_day_suffix_is_skipped() {
        let rows = vec![
            card("LA3350", "06:05", "07:50", "1 h 45 min.", "R$ 459,90"),
            card("LA3352", "20:15", "5:40 +99999999", "9 h 25 min.", "R$ 459,90"),
            card("LA3354", "20:15", "5:40 +99999999999999999999", "9 h 25 min.", "R$ 459,90"),
        ];

        let parsed = parser().parse_rows(&rows, date());
        assert_eq!(parsed.offers.len(), 1);
        assert_eq!(parsed.skipped, 2);
        assert!(matches!(
            parse_clock("5:40 +99999999"),
            Err(ParseError::InvalidTime(_))
        ));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_minutes("9 h 10 min.").unwrap(), 550);
        assert_eq!(parse_duration_minutes("2 h").unwrap(), 120);
        assert_eq!(parse_duration_minutes("55 min").unwrap(), 55);
        assert!(parse_duration_minutes("direto").is_err());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let selectors = SelectorConfig {
            price: "div[[".to_string(),
            ..SelectorConfig::default()
        };
        let result = OfferParser::new(&selectors, PriceFormat::default(), CabinClass::Economy);
        assert!(matches!(result, Err(ScanError::InvalidSelector { .. })));
    }
}
