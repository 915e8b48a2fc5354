//! Shared fixtures for the integration tests.
//!
//! `ScriptedTransport` answers GET requests from a URL -> response table and
//! records every request, so tests can assert on what went over the "wire".
//! An optional gate parks tariff requests until the test releases them.

#![allow(dead_code)]

use async_trait::async_trait;
use flexprice::config::Config;
use flexprice::error::{FlexPriceError, Result};
use flexprice::http::{HttpRequest, HttpResponse, HttpTransport};
use flexprice::settings::SettingsStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const PAGE_URL: &str = "https://www.example.test/dynamisch/";
pub const SCRIPT_URL: &str =
    "https://cdn.vattenfall.nl/vattenfallnlprd/features/epi/2.41.0/epi-es2015.js";
pub const API_BASE: &str = "https://api.example/v1";
pub const TARIFF_URL: &str = "https://api.example/v1/DynamicTariff";

pub const ONE_PRODUCT: &str = r#"[{"product":"E","tariffData":[{"startTime":"2024-01-01T00:00:00","endTime":"2024-01-01T01:00:00","amountInclVat":0.25}]}]"#;

pub const TWO_PRODUCTS: &str = r#"[
  {"product":"E","name":"Stroom","productCode":"E-DYN","tariffData":[
    {"startTime":"2024-01-01T02:00:00","endTime":"2024-01-01T03:00:00","amountInclVat":0.31,"amountExclVat":0.26},
    {"startTime":"2024-01-01T00:00:00","endTime":"2024-01-01T01:00:00","amountInclVat":0.25,"amountExclVat":0.21},
    {"startTime":"2024-01-01T01:00:00","endTime":"2024-01-01T02:00:00","amountInclVat":0.18,"amountExclVat":0.15,"cheapestOfDay":true}
  ],"averageTariffs":[{"date":"2024-01-01T00:00:00","amountInclVat":0.25,"amountExclVat":0.21}]},
  {"product":"G","name":"Gas","productCode":"G-DYN","tariffData":[
    {"startTime":"2024-01-01T00:00:00","endTime":"2024-01-02T00:00:00","amountInclVat":1.12,"amountExclVat":0.93}
  ],"averageTariffs":[]}
]"#;

pub fn page_html() -> String {
    format!(
        r#"<!doctype html><html><head><script src="{}" defer></script></head><body></body></html>"#,
        SCRIPT_URL
    )
}

pub fn script_js(base: &str, key: &str) -> String {
    format!(
        r#"!function(){{var n={{env:"prd",dynamicTariffsBaseApiURL:"{}/",ocpApimSubscriptionFeaturesDynamicTariffsKey:"{}"}}}}();"#,
        base, key
    )
}

#[derive(Clone)]
enum Reply {
    Ok(u16, String),
    Fail(String),
}

#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, body: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Ok(status, body.into()));
    }

    pub fn fail(&self, url: &str, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Fail(message.to_string()));
    }

    /// Scrape page and script both answer with a working credential pair
    pub fn serve_credentials(&self, key: &str) {
        self.respond(PAGE_URL, 200, page_html());
        self.respond(SCRIPT_URL, 200, script_js(API_BASE, key));
    }

    /// Park the next tariff request until `release_tariff_requests`
    pub fn hold_tariff_requests(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Let the parked request through; later requests are not held
    pub fn release_tariff_requests(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_one();
        }
    }

    /// Resolves once a tariff request is parked at the gate
    pub async fn wait_until_parked(&self) {
        self.entered.notified().await;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if request.url == TARIFF_URL {
            let gate = self.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                self.entered.notify_one();
                gate.notified().await;
            }
        }

        let reply = self.replies.lock().unwrap().get(&request.url).cloned();
        match reply {
            Some(Reply::Ok(status, body)) => Ok(HttpResponse { status, body }),
            Some(Reply::Fail(message)) => Err(FlexPriceError::network(message)),
            None => Err(FlexPriceError::network(format!(
                "no scripted reply for {}",
                request.url
            ))),
        }
    }
}

pub fn known_values_config() -> Config {
    let mut cfg = Config::default();
    cfg.source.use_known_values = true;
    cfg.source.known_api_base_url = API_BASE.to_string();
    cfg.source.known_api_key = "k".to_string();
    cfg
}

pub fn scraping_config() -> Config {
    let mut cfg = Config::default();
    cfg.source.scrape_page_url = PAGE_URL.to_string();
    cfg
}

pub fn store(cfg: Config) -> SettingsStore {
    SettingsStore::new(cfg)
}
