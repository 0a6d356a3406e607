use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::capture::{default_viewports, ViewportSpec};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
    #[error("failed to parse {name} as date: {value}")]
    ParseDate { name: String, value: String },
}

/// Step between requested snapshot instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    Years(u32),
    Months(u32),
    Days(u32),
}

impl Increment {
    /// Advance an instant by one step. `None` on calendar overflow.
    #[must_use]
    pub fn advance(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Years(n) => from.checked_add_months(Months::new(n * 12)),
            Self::Months(n) => from.checked_add_months(Months::new(*n)),
            Self::Days(n) => from.checked_add_days(Days::new(u64::from(*n))),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Constructed once at process start and passed by reference; there is no
/// global configuration state.
#[derive(Debug, Clone)]
pub struct Config {
    // Targets
    pub pages_csv: PathBuf,
    /// Single-URL override of the CSV list.
    pub single_url: Option<String>,

    // Time range
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub increment: Increment,

    // Persistence
    pub overwrite: bool,
    pub database_path: PathBuf,
    pub scrapes_dir: PathBuf,

    // Browser
    pub chrome_path: Option<String>,
    pub page_timeout: Duration,
    pub viewports: Vec<ViewportSpec>,

    // Outbound HTTP
    pub http_timeout: Duration,
    pub availability_url: String,
    pub web_url: String,
    pub ip_lookup_url: String,
    pub geo_lookup_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            pages_csv: PathBuf::from(env_or_default("PAGES_CSV", "./data/pages.csv")),
            single_url: optional_env("URL"),

            start_date: parse_env_date("START_DATE", "2012-01-01")?,
            end_date: match optional_env("END_DATE") {
                Some(value) => parse_date("END_DATE", &value)?,
                None => Utc::now(),
            },
            increment: parse_increment("INCREMENT", &env_or_default("INCREMENT", "1y"))?,

            overwrite: parse_env_bool("OVERWRITE", false)?,
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/archive.sqlite")),
            scrapes_dir: PathBuf::from(env_or_default("SCRAPES_DIR", "./data/scrapes")),

            chrome_path: optional_env("CHROME_PATH"),
            page_timeout: Duration::from_secs(parse_env_u64("PAGE_TIMEOUT_SECS", 30)?),
            viewports: default_viewports(),

            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),
            availability_url: env_or_default(
                "WAYBACK_AVAILABILITY_URL",
                "https://archive.org/wayback/available",
            ),
            web_url: env_or_default("WAYBACK_WEB_URL", "https://web.archive.org/web"),
            ip_lookup_url: env_or_default("IP_LOOKUP_URL", "https://api.ipify.org"),
            geo_lookup_url: env_or_default("GEO_LOOKUP_URL", "http://ip-api.com/json"),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_date >= self.end_date {
            return Err(ConfigError::InvalidValue {
                name: "START_DATE".to_string(),
                message: "must be before END_DATE".to_string(),
            });
        }
        if self.viewports.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "viewports".to_string(),
                message: "at least one viewport is required".to_string(),
            });
        }
        if let Some(viewport) = self.viewports.iter().find(|v| v.width == 0) {
            return Err(ConfigError::InvalidValue {
                name: "viewports".to_string(),
                message: format!("viewport {:?} has zero width", viewport.name),
            });
        }
        Ok(())
    }

    /// Fixed configuration for tests: no environment access, local paths.
    ///
    /// The date range is empty; tests set their own window.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            pages_csv: PathBuf::from("./data/pages.csv"),
            single_url: None,
            start_date: DateTime::<Utc>::UNIX_EPOCH,
            end_date: DateTime::<Utc>::UNIX_EPOCH,
            increment: Increment::Years(1),
            overwrite: false,
            database_path: PathBuf::from("./data/archive.sqlite"),
            scrapes_dir: PathBuf::from("./data/scrapes"),
            chrome_path: None,
            page_timeout: Duration::from_secs(30),
            viewports: default_viewports(),
            http_timeout: Duration::from_secs(30),
            availability_url: "https://archive.org/wayback/available".to_string(),
            web_url: "https://web.archive.org/web".to_string(),
            ip_lookup_url: "https://api.ipify.org".to_string(),
            geo_lookup_url: "http://ip-api.com/json".to_string(),
        }
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

fn parse_env_date(name: &str, default: &str) -> Result<DateTime<Utc>, ConfigError> {
    match optional_env(name) {
        Some(value) => parse_date(name, &value),
        None => parse_date(name, default),
    }
}

/// Parse an RFC 3339 instant or a plain `YYYY-MM-DD` date (midnight UTC).
fn parse_date(name: &str, value: &str) -> Result<DateTime<Utc>, ConfigError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(ConfigError::ParseDate {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Parse a step expression such as `1y`, `6m`, `30d`, or `2 years`.
fn parse_increment(name: &str, value: &str) -> Result<Increment, ConfigError> {
    let trimmed = value.trim().to_lowercase();
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    let unit = trimmed[digits.len()..].trim();

    let count: u32 = digits.parse().map_err(|e| ConfigError::ParseInt {
        name: name.to_string(),
        source: e,
    })?;
    if count == 0 {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: "step count must be at least 1".to_string(),
        });
    }

    match unit {
        "y" | "yr" | "year" | "years" => Ok(Increment::Years(count)),
        "m" | "month" | "months" => Ok(Increment::Months(count)),
        "d" | "day" | "days" => Ok(Increment::Days(count)),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("unknown step unit {unit:?} (expected y, m, or d)"),
        }),
    }
}
