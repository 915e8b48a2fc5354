use super::types::TariffProduct;
use crate::error::{FlexPriceError, Result};
use crate::http::{HttpRequest, HttpTransport};
use crate::scrape::Credentials;
use std::time::Duration;

pub const TARIFF_PATH: &str = "DynamicTariff";
pub const SUBSCRIPTION_KEY_HEADER: &str = "ocp-apim-subscription-key";

pub fn tariff_url(api_base_url: &str) -> String {
    format!("{}/{}", api_base_url.trim_end_matches('/'), TARIFF_PATH)
}

pub fn tariff_request(credentials: &Credentials, timeout: Duration) -> Result<HttpRequest> {
    if !credentials.is_complete() {
        return Err(FlexPriceError::config(
            "No API base URL or key available for the tariff request",
        ));
    }
    Ok(HttpRequest::get(tariff_url(&credentials.api_base_url))
        .header(SUBSCRIPTION_KEY_HEADER, credentials.api_key.clone())
        .timeout(timeout))
}

/// Raw body of the tariff endpoint; any non-2xx status is an error
pub async fn fetch_tariff_body(
    transport: &dyn HttpTransport,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<String> {
    let request = tariff_request(credentials, timeout)?;
    transport
        .get(request)
        .await?
        .into_success_body("tariff API")
}

pub fn parse_tariffs(body: &str) -> Result<Vec<TariffProduct>> {
    Ok(serde_json::from_str(body)?)
}
