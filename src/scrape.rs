//! Credential discovery for the tariff API
//!
//! The tariff API has no public documentation. Its base URL and subscription
//! key are embedded in the `epi-es2015.js` bundle that the provider's public
//! "dynamic contract" page loads from its CDN. Discovery follows that chain:
//! page HTML -> script URL -> script text -> base URL and key.
//!
//! Resolution never fails: on any error the last scraped pair is used, or the
//! configured known pair while nothing has been scraped yet.

use crate::config::SourceConfig;
use crate::error::{FlexPriceError, Result};
use crate::http::{HttpRequest, HttpTransport};
use crate::logging::{StructuredLogger, get_logger, mask_secret};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const EPI_SCRIPT_PATTERN: &str = r#"src="(?P<url>https://cdn\.vattenfall\.nl/vattenfallnlprd/features/epi/[^/"]*/epi-es2015\.js)""#;
const API_BASE_URL_PATTERN: &str = r#"dynamicTariffsBaseApiURL:"(?P<url>[^"]*)"#;
const API_KEY_PATTERN: &str = r#"ocpApimSubscriptionFeaturesDynamicTariffsKey:"(?P<key>[^"]*)"#;

/// API base URL and subscription key
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_base_url: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(api_base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Seed values from the configured known pair
    pub fn from_source(source: &SourceConfig) -> Self {
        Self::new(
            source.known_api_base_url.clone(),
            source.known_api_key.clone(),
        )
    }

    pub fn is_complete(&self) -> bool {
        !self.api_base_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

// Keep the key out of Debug output; it ends up in logs otherwise
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &mask_secret(&self.api_key))
            .finish()
    }
}

/// Compiled extraction patterns
#[derive(Debug, Clone)]
pub struct ScriptPatterns {
    epi_script: Regex,
    api_base_url: Regex,
    api_key: Regex,
}

impl ScriptPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            epi_script: Regex::new(EPI_SCRIPT_PATTERN)?,
            api_base_url: Regex::new(API_BASE_URL_PATTERN)?,
            api_key: Regex::new(API_KEY_PATTERN)?,
        })
    }

    /// First `epi-es2015.js` script URL referenced by the page
    pub fn script_url(&self, html: &str) -> Result<String> {
        let url = first_capture(&self.epi_script, html, "url").unwrap_or_default();
        let well_formed = url::Url::parse(url)
            .map(|u| u.has_host())
            .unwrap_or(false);
        if url.trim().is_empty() || !well_formed {
            return Err(FlexPriceError::scrape(
                "Could not find the epi-es2015.js script URL",
            ));
        }
        Ok(url.to_string())
    }

    /// API base URL from the script, without trailing slash
    pub fn api_base_url(&self, js: &str) -> Result<String> {
        let url = first_capture(&self.api_base_url, js, "url")
            .unwrap_or_default()
            .trim()
            .trim_end_matches('/');
        if url.is_empty() {
            return Err(FlexPriceError::scrape("Could not find the API base URL"));
        }
        Ok(url.to_string())
    }

    /// Subscription key from the script
    pub fn api_key(&self, js: &str) -> Result<String> {
        let key = first_capture(&self.api_key, js, "key")
            .unwrap_or_default()
            .trim();
        if key.is_empty() {
            return Err(FlexPriceError::scrape("Could not find the API key"));
        }
        Ok(key.to_string())
    }
}

fn first_capture<'t>(re: &Regex, haystack: &'t str, group: &str) -> Option<&'t str> {
    re.captures(haystack)
        .and_then(|c| c.name(group))
        .map(|m| m.as_str())
}

/// Resolves the credentials used for the tariff API
pub struct CredentialResolver {
    transport: Arc<dyn HttpTransport>,
    patterns: ScriptPatterns,
    logger: StructuredLogger,
}

impl CredentialResolver {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Ok(Self {
            transport,
            patterns: ScriptPatterns::new()?,
            logger: get_logger("scrape"),
        })
    }

    /// Credentials for this refresh cycle
    ///
    /// With `use_known_values` the configured pair is returned without any
    /// network call. Otherwise the scrape chain runs and on success `cache` is
    /// overwritten. On failure the cached pair is returned if it is complete;
    /// otherwise the known pair from `source`, read fresh on every call.
    pub async fn resolve(&self, source: &SourceConfig, cache: &mut Credentials) -> Credentials {
        if source.use_known_values {
            let known = Credentials::from_source(source);
            if !known.is_complete() {
                self.logger
                    .warn("use_known_values is set but the known API base URL or key is empty");
            }
            return known;
        }

        match self
            .discover(&source.scrape_page_url, source.scrape_timeout())
            .await
        {
            Ok(found) => {
                *cache = found.clone();
                found
            }
            Err(e) if cache.is_complete() => {
                self.logger.error(&format!(
                    "Failed to get API URL and key dynamically, reusing the last scraped values: {}",
                    e
                ));
                cache.clone()
            }
            Err(e) => {
                self.logger.error(&format!(
                    "Failed to get API URL and key dynamically, falling back to the configured known values: {}",
                    e
                ));
                Credentials::from_source(source)
            }
        }
    }

    /// Run the scrape chain once
    pub async fn discover(&self, page_url: &str, timeout: Duration) -> Result<Credentials> {
        let html = self.fetch_text(page_url, timeout, "scrape page").await?;

        let script_url = self.patterns.script_url(&html)?;
        self.logger
            .info(&format!("Found epi JS script: {}", script_url));

        let js = self.fetch_text(&script_url, timeout, "epi script").await?;

        let api_base_url = self.patterns.api_base_url(&js)?;
        self.logger
            .info(&format!("API base URL: {}", api_base_url));

        let api_key = self.patterns.api_key(&js)?;
        self.logger
            .info(&format!("API key: {}", mask_secret(&api_key)));

        Ok(Credentials::new(api_base_url, api_key))
    }

    async fn fetch_text(&self, url: &str, timeout: Duration, what: &str) -> Result<String> {
        self.transport
            .get(HttpRequest::get(url).timeout(timeout))
            .await?
            .into_success_body(what)
    }
}
