//! Error types and handling for FlexPrice
//!
//! This module defines the error types used throughout the application.
//! Refresh-cycle failures are logged at the cycle boundary and never reach
//! HTTP callers; only configuration errors are fatal.

use thiserror::Error;

/// Result type alias for FlexPrice operations
pub type Result<T> = std::result::Result<T, FlexPriceError>;

/// Main error type for FlexPrice
#[derive(Debug, Error)]
pub enum FlexPriceError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Network-related errors (connect, TLS, body decoding)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Upstream tariff API errors (non-2xx responses)
    #[error("API error: {message}")]
    Api { message: String },

    /// Credential discovery failed on the scrape page or its script
    #[error("Scrape error: {message}")]
    Scrape { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// HTTP server errors (bind, accept loop)
    #[error("Web server error: {message}")]
    Web { message: String },
}

impl FlexPriceError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new scrape error
    pub fn scrape<S: Into<String>>(message: S) -> Self {
        Self::Scrape {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        Self::Web {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for FlexPriceError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for FlexPriceError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<serde_json::Error> for FlexPriceError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<reqwest::Error> for FlexPriceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<regex::Error> for FlexPriceError {
    fn from(err: regex::Error) -> Self {
        Self::config(format!("invalid pattern: {}", err))
    }
}

impl From<chrono::ParseError> for FlexPriceError {
    fn from(err: chrono::ParseError) -> Self {
        Self::validation("datetime", err.to_string())
    }
}
