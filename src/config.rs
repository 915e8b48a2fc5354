//! Configuration management for FlexPrice
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{FlexPriceError, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod defaults;

/// Lower bound for the refresh interval, bounds the load on the upstream API
pub const MIN_REFRESH_INTERVAL_SECONDS: u64 = 60;

/// Prefix of environment variables that override file values
pub const ENV_PREFIX: &str = "FLEXPRICE_";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "FLEXPRICE_CONFIG";

const DEFAULT_PATHS: [&str; 3] = [
    "flexprice.yaml",
    "/data/flexprice.yaml",
    "/etc/flexprice/config.yaml",
];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct Config {
    /// Upstream tariff source and refresh behaviour
    pub source: SourceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,
}

/// Where tariffs come from and how often they are refreshed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct SourceConfig {
    /// Skip scraping and use the known base URL and key as-is
    pub use_known_values: bool,

    /// Public page whose script bundle carries the API credentials
    pub scrape_page_url: String,

    /// API base URL used when scraping is disabled or has never succeeded
    pub known_api_base_url: String,

    /// Subscription key used when scraping is disabled or has never succeeded
    pub known_api_key: String,

    /// Seconds between refreshes, floored to 60
    pub refresh_interval_seconds: u64,

    /// Timeout for the scrape page and script requests
    pub scrape_timeout_seconds: u64,

    /// Timeout for the tariff API request
    pub api_timeout_seconds: u64,

    /// Unit of `value` in the EVCC view
    pub evcc_unit: PriceUnit,

    /// IANA timezone of the upstream wall-clock timestamps; empty means system local time
    pub timezone: String,
}

/// Unit of the amounts exposed in the EVCC view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
    /// Upstream unit (EUR/kWh, EUR/m3)
    #[default]
    Currency,
    /// Hundredths of the upstream unit
    Cents,
}

impl PriceUnit {
    /// Multiplier applied to upstream amounts
    pub fn factor(self) -> u32 {
        match self {
            Self::Currency => 1,
            Self::Cents => 100,
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "currency" | "eur" => Some(Self::Currency),
            "cents" | "ct" => Some(Self::Cents),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Level for HTTP request tracing
    pub http_level: String,

    /// Log file path; empty disables file logging
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl SourceConfig {
    /// Effective refresh interval, never below the upstream-friendly minimum
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.refresh_interval_seconds
                .max(MIN_REFRESH_INTERVAL_SECONDS),
        )
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_seconds)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_seconds)
    }

    /// Parsed timezone; `None` means system local time
    pub fn tz(&self) -> Result<Option<Tz>> {
        let name = self.timezone.trim();
        if name.is_empty() {
            return Ok(None);
        }
        name.parse::<Tz>().map(Some).map_err(|_| {
            FlexPriceError::validation("source.timezone", format!("unknown timezone '{name}'"))
        })
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// First existing configuration file, honouring `FLEXPRICE_CONFIG`
    pub fn locate() -> Option<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(explicit));
        }
        DEFAULT_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }

    /// Load from `path` (or defaults when `None`) and apply environment overrides
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(std::env::vars())?;
        Ok(config)
    }

    /// Load from the default locations
    pub fn load() -> Result<Self> {
        Self::load_from(Self::locate().as_deref())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply `FLEXPRICE_*` overrides from the given variables
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value: String = value.into();
            match name {
                "USE_KNOWN_VALUES" => {
                    self.source.use_known_values = parse_bool(name, &value)?;
                }
                "SCRAPE_PAGE_URL" => self.source.scrape_page_url = value,
                "KNOWN_API_BASE_URL" => self.source.known_api_base_url = value,
                "KNOWN_API_KEY" => self.source.known_api_key = value,
                "REFRESH_INTERVAL_SECONDS" => {
                    self.source.refresh_interval_seconds = parse_number(name, &value)?;
                }
                "EVCC_UNIT" => {
                    self.source.evcc_unit = PriceUnit::from_label(&value).ok_or_else(|| {
                        FlexPriceError::validation(name, format!("unknown unit '{value}'"))
                    })?;
                }
                "TIMEZONE" => self.source.timezone = value,
                "LOG_LEVEL" => self.logging.level = value,
                "WEB_HOST" => self.web.host = value,
                "WEB_PORT" => self.web.port = parse_number(name, &value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.source.use_known_values {
            let scrape = self.source.scrape_page_url.trim();
            if scrape.is_empty() {
                return Err(FlexPriceError::validation(
                    "source.scrape_page_url",
                    "Must be set unless use_known_values is enabled",
                ));
            }
            if url::Url::parse(scrape).is_err() {
                return Err(FlexPriceError::validation(
                    "source.scrape_page_url",
                    "Must be an absolute URL",
                ));
            }
        }

        if self.source.scrape_timeout_seconds == 0 {
            return Err(FlexPriceError::validation(
                "source.scrape_timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if self.source.api_timeout_seconds == 0 {
            return Err(FlexPriceError::validation(
                "source.api_timeout_seconds",
                "Must be greater than 0",
            ));
        }

        self.source.tz()?;

        crate::logging::parse_log_level(&self.logging.level)?;
        crate::logging::parse_log_level(&self.logging.http_level)?;

        if self.web.port == 0 {
            return Err(FlexPriceError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(FlexPriceError::validation(
            field,
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| FlexPriceError::validation(field, format!("expected a number, got '{value}'")))
}
