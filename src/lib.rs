//! # FlexPrice - dynamic energy tariff cache
//!
//! Serves dynamic electricity and gas tariffs from an in-memory cache that is
//! refreshed on a fixed interval from an undocumented upstream API. The API
//! credentials are discovered by scraping the provider's public page.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration with environment overrides and validation
//! - `settings`: live configuration store with file hot reload
//! - `logging`: structured logging and tracing
//! - `http`: GET transport used for scraping and the tariff API
//! - `scrape`: credential discovery with fallback to last known values
//! - `tariff`: wire types, EVCC view derivation, current-value lookup
//! - `engine`: single-flight refresh and lock-free snapshot reads
//! - `web`: HTTP server and REST API

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod logging;
pub mod scrape;
pub mod settings;
pub mod tariff;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use engine::{RefreshOutcome, RefreshPhase, TariffEngine, TariffState};
pub use error::{FlexPriceError, Result};
pub use settings::SettingsStore;
