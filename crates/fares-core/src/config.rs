//! Configuration management for the fares extractor.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Inner components never read the
//! environment themselves; the validated values are handed to them
//! explicitly through [`AppConfig::extraction_plan`] and the section structs.

use crate::dates::{DateRange, Inclusivity};
use crate::error::{ConfigError, ConfigResult, Result};
use crate::types::{AirportCode, CabinClass};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/fares/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Route to query
    pub route: RouteConfig,
    /// Travel dates to query
    pub dates: DatesConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Per-query retry policy
    pub retry: RetryConfig,
    /// Scanning behavior settings
    pub scanning: ScanningConfig,
    /// CSS selectors for the result page
    pub selectors: SelectorConfig,
    /// Output artifact settings
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path. A missing file is an error.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `FARES_ORIGIN` / `FARES_DESTINATION`: airport codes
    /// - `FARES_START_DATE` / `FARES_END_DATE`: `YYYY-MM-DD`
    /// - `FARES_HEADLESS`: browser headless mode (true/false)
    /// - `FARES_LOG_LEVEL`: log verbosity
    /// - `FARES_WORK_DIR`: temp/working directory for artifacts
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("FARES_ORIGIN") {
            tracing::debug!("Override route.origin from env: {}", val);
            self.route.origin = val;
        }

        if let Some(val) = lookup("FARES_DESTINATION") {
            tracing::debug!("Override route.destination from env: {}", val);
            self.route.destination = val;
        }

        if let Some(val) = lookup("FARES_START_DATE") {
            self.dates.start = parse_date_var("FARES_START_DATE", &val)?;
            tracing::debug!("Override dates.start from env: {}", val);
        }

        if let Some(val) = lookup("FARES_END_DATE") {
            self.dates.end = parse_date_var("FARES_END_DATE", &val)?;
            tracing::debug!("Override dates.end from env: {}", val);
        }

        if let Some(val) = lookup("FARES_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("FARES_LOG_LEVEL") {
            self.general.log_level = val;
        }

        if let Some(val) = lookup("FARES_WORK_DIR") {
            self.output.work_dir = PathBuf::from(val);
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/fares/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "fares", "fares").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Validate route and dates into the plan the orchestrator runs.
    ///
    /// # Errors
    /// Returns [`crate::FaresError::InvalidRange`] when the start date lies after the
    /// end date, and [`ConfigError::InvalidValue`] (wrapped in
    /// [`crate::FaresError::Config`]) for bad airport codes, identical origin and
    /// destination, or a retry policy with zero attempts.
    pub fn extraction_plan(&self) -> Result<ExtractionPlan> {
        let origin = AirportCode::new(&self.route.origin).map_err(|e| invalid("route.origin", e))?;
        let destination = AirportCode::new(&self.route.destination)
            .map_err(|e| invalid("route.destination", e))?;
        if origin == destination {
            return Err(invalid(
                "route.destination",
                format!("must differ from origin {origin}"),
            )
            .into());
        }

        let inclusivity = if self.dates.end_inclusive {
            Inclusivity::Inclusive
        } else {
            Inclusivity::Exclusive
        };
        let dates = DateRange::new(self.dates.start, self.dates.end, inclusivity)?;

        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1").into());
        }

        Ok(ExtractionPlan {
            origin,
            destination,
            origin_name: self.route.origin_name.clone(),
            destination_name: self.route.destination_name.clone(),
            dates,
        })
    }
}

fn invalid(field: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_date_var(field: &str, value: &str) -> ConfigResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| invalid(field, e))
}

/// Validated route and date range for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    /// Origin airport
    pub origin: AirportCode,
    /// Destination airport
    pub destination: AirportCode,
    /// Human-readable origin name
    pub origin_name: String,
    /// Human-readable destination name
    pub destination_name: String,
    /// Travel dates to query
    pub dates: DateRange,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log verbosity: an `EnvFilter` directive such as `info` or `fares=debug`
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Route to query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Origin airport code
    pub origin: String,
    /// Destination airport code
    pub destination: String,
    /// Origin display name
    pub origin_name: String,
    /// Destination display name
    pub destination_name: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            origin: "GRU".to_string(),
            destination: "GIG".to_string(),
            origin_name: "São Paulo".to_string(),
            destination_name: "Rio de Janeiro".to_string(),
        }
    }
}

/// Travel dates to query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
    /// First travel date
    pub start: NaiveDate,
    /// Last travel date
    pub end: NaiveDate,
    /// Whether `end` itself is queried
    pub end_inclusive: bool,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 7, 7).unwrap_or_default(),
            end_inclusive: true,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// How long to wait for the result page to settle, in seconds
    pub page_timeout_secs: u64,
    /// Navigation attempts before giving up on a URL
    pub nav_retries: u32,
    /// First navigation backoff delay in milliseconds, doubled per attempt
    pub nav_backoff_base_ms: u64,
    /// Visit the home page and dismiss banners before searching
    pub warm_up: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            page_timeout_secs: 15,
            nav_retries: 3,
            nav_backoff_base_ms: 500,
            warm_up: true,
        }
    }
}

/// Per-query retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per query, including the first
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds, scaled by attempt number
    pub base_delay_ms: u64,
    /// Extra multiplier applied after a timeout
    pub timeout_backoff_multiplier: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            timeout_backoff_multiplier: 2,
        }
    }
}

/// Scanning behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Concurrent workers, each with its own browser sessions
    pub workers: usize,
    /// Delay between queries in milliseconds
    pub delay_between_queries_ms: u64,
    /// Cabin class to search
    pub cabin: CabinClass,
    /// Adult passengers
    pub adults: u32,
    /// Child passengers
    pub children: u32,
    /// Infant passengers
    pub infants: u32,
    /// Currency assumed when the price has a bare `$` symbol
    pub default_currency: String,
    /// Locale thousands separator in prices
    pub thousands_separator: char,
    /// Locale decimal separator in prices
    pub decimal_separator: char,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            delay_between_queries_ms: 1000,
            cabin: CabinClass::Economy,
            adults: 1,
            children: 0,
            infants: 0,
            default_currency: "BRL".to_string(),
            thousands_separator: '.',
            decimal_separator: ',',
        }
    }
}

/// CSS selectors for the search result page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Present once the flight list rendered
    pub results_loaded: String,
    /// Present when the site reports no flights
    pub no_results: String,
    /// One element per flight card
    pub result_row: String,
    /// Within a card: departure time
    pub departure_time: String,
    /// Within a card: arrival time, possibly with a `+N` day suffix
    pub arrival_time: String,
    /// Within a card: flight duration
    pub duration: String,
    /// Within a card: price text
    pub price: String,
    /// Within a card: operating carrier
    pub operator: String,
    /// Within a card: flight number
    pub flight_number: String,
    /// Within a card: marker shown when the flight is sold out
    pub sold_out: String,
    /// Banners and modals to close during warm-up
    pub dismiss: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            results_loaded: r#"ol[aria-label="Voos disponíveis."]"#.to_string(),
            no_results: r#"[data-testid="no-flights-available"]"#.to_string(),
            result_row: r#"li[class*="ListItemAvailableFlights"]"#.to_string(),
            departure_time: r#"div[data-testid$="-origin"] span[class*="TextHourFlight"]"#
                .to_string(),
            arrival_time: r#"div[data-testid$="-destination"] span[class*="TextHourFlight"]"#
                .to_string(),
            duration: r#"div[data-testid$="-duration"] span[class*="Duration"]"#.to_string(),
            price: r#"div[data-testid$="-amount"] span[class*="CurrencyAmount"]"#.to_string(),
            operator: r#"div[class*="OperatorName"]"#.to_string(),
            flight_number: r#"[data-testid$="-flight-number"]"#.to_string(),
            sold_out: r#"[data-testid$="-sold-out"]"#.to_string(),
            dismiss: vec![
                "#cookies-politics-button".to_string(),
                "#button-close-login-incentive".to_string(),
            ],
        }
    }
}

/// Output artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Local working directory where artifacts are written before upload
    pub work_dir: PathBuf,
    /// Root directory of the artifact store
    pub destination_root: PathBuf,
    /// Key prefix for uploaded artifacts
    pub key_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("./fares_temp"),
            destination_root: PathBuf::from("./fares_output"),
            key_prefix: "latam".to_string(),
        }
    }
}
