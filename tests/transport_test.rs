use flate2::Compression;
use flate2::write::GzEncoder;
use flexprice::error::FlexPriceError;
use flexprice::http::{HttpRequest, HttpTransport, ReqwestTransport};
use flexprice::scrape::ScriptPatterns;
use flexprice::{Config, RefreshOutcome, SettingsStore, TariffEngine};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARIFFS: &str = r#"[{"product":"E","tariffData":[{"startTime":"2024-01-01T00:00:00","endTime":"2024-01-01T01:00:00","amountInclVat":0.25}]}]"#;

fn gzip(body: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

#[tokio::test]
async fn gzip_bodies_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/compressed"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(gzip("hello tariffs")),
        )
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new().unwrap();
    let response = transport
        .get(HttpRequest::get(format!("{}/compressed", server.uri())))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "hello tariffs");
}

#[tokio::test]
async fn custom_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/DynamicTariff"))
        .and(header("ocp-apim-subscription-key", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new().unwrap();
    let response = transport
        .get(
            HttpRequest::get(format!("{}/DynamicTariff", server.uri()))
                .header("ocp-apim-subscription-key", "secret-key"),
        )
        .await
        .unwrap();
    assert_eq!(response.body, "[]");
}

#[tokio::test]
async fn error_status_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new().unwrap();
    let response = transport
        .get(HttpRequest::get(server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status, 401);
    assert!(!response.is_success());
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new().unwrap();
    let err = transport
        .get(HttpRequest::get(server.uri()).timeout(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, FlexPriceError::Timeout { .. }));
}

#[tokio::test]
async fn compressed_scrape_page_yields_script_url() {
    let server = MockServer::start().await;
    let page = r#"<html><script src="https://cdn.vattenfall.nl/vattenfallnlprd/features/epi/3.0.1/epi-es2015.js"></script></html>"#;
    Mock::given(method("GET"))
        .and(path("/dynamisch"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(gzip(page)),
        )
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new().unwrap();
    let body = transport
        .get(HttpRequest::get(format!("{}/dynamisch", server.uri())))
        .await
        .unwrap()
        .into_success_body("scrape page")
        .unwrap();
    assert_eq!(
        ScriptPatterns::new().unwrap().script_url(&body).unwrap(),
        "https://cdn.vattenfall.nl/vattenfallnlprd/features/epi/3.0.1/epi-es2015.js"
    );
}

#[tokio::test]
async fn engine_fetches_over_real_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/DynamicTariff"))
        .and(header("ocp-apim-subscription-key", "k"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TARIFFS))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = Config::default();
    cfg.source.use_known_values = true;
    cfg.source.known_api_base_url = format!("{}/api/", server.uri());
    cfg.source.known_api_key = "k".to_string();
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    let engine = TariffEngine::new(SettingsStore::new(cfg), transport).unwrap();

    assert_eq!(engine.refresh().await, RefreshOutcome::Published);
    assert_eq!(engine.derived_view().len(), 1);
    assert_eq!(engine.snapshot()[0].tariff_data[0].amount_incl_vat, 0.25);
}
