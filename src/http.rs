//! HTTP transport used for scraping and for the tariff API
//!
//! The engine and the credential resolver only see the [`HttpTransport`]
//! trait, so tests can script responses without a network.

use crate::error::{FlexPriceError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::Duration;

/// Timeout applied when a request does not carry its own
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("flexprice/", env!("APP_VERSION"));

/// A GET request with extra headers and an optional timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    /// Add a request header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Decoded response: status code and body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body of a 2xx response; anything else becomes an API error naming `what`
    pub fn into_success_body(self, what: &str) -> Result<String> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(FlexPriceError::api(format!(
                "{} returned HTTP {}",
                what, self.status
            )))
        }
    }
}

/// GET-only transport capability
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Transport backed by a shared `reqwest` client with gzip/deflate decoding
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client; compressed bodies are decoded transparently
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .gzip(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    fn headers(request: &HttpRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                FlexPriceError::validation("header", format!("invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                FlexPriceError::validation("header", format!("invalid header value: {e}"))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse> {
        let headers = Self::headers(&request)?;
        let resp = self
            .client
            .get(&request.url)
            .headers(headers)
            .timeout(request.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }
}
