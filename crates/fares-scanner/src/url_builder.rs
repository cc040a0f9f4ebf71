use crate::error::{Result, ScanError};
use fares_browser::BrowserError;
use fares_core::{AppConfig, CabinClass, SearchQuery};
use url::Url;

pub const LATAM_HOME_URL: &str = "https://www.latamairlines.com/br/pt";
pub const LATAM_SEARCH_URL: &str = "https://www.latamairlines.com/br/pt/oferta-voos";

/// Passenger mix and cabin for a one-way search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
    pub cabin: CabinClass,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            adults: 1,
            children: 0,
            infants: 0,
            cabin: CabinClass::Economy,
        }
    }
}

impl SearchParams {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            adults: config.scanning.adults,
            children: config.scanning.children,
            infants: config.scanning.infants,
            cabin: config.scanning.cabin,
        }
    }
}

/// Build the one-way offer search URL for `query`.
///
/// A fresh `exp_id` is generated per call so each search looks like a new
/// visit.
pub fn build_search_url(base: &str, query: &SearchQuery, params: &SearchParams) -> Result<String> {
    let outbound = format!("{}T00:00:00.000Z", query.date().format("%Y-%m-%d"));
    let exp_id = uuid::Uuid::new_v4().to_string();
    let (adults, children, infants) = (
        params.adults.to_string(),
        params.children.to_string(),
        params.infants.to_string(),
    );

    let url = Url::parse_with_params(
        base,
        &[
            ("origin", query.origin().as_str()),
            ("destination", query.destination().as_str()),
            ("outbound", outbound.as_str()),
            ("adt", adults.as_str()),
            ("chd", children.as_str()),
            ("inf", infants.as_str()),
            ("trip", "OW"),
            ("cabin", params.cabin.as_str()),
            ("redemption", "false"),
            ("sort", "RECOMMENDED"),
            ("exp_id", exp_id.as_str()),
        ],
    )
    .map_err(|e| {
        ScanError::Browser(BrowserError::Navigation(format!(
            "invalid search base {base}: {e}"
        )))
    })?;

    Ok(url.into())
}
