//! Axum HTTP front end over the tariff cache
//!
//! Handlers only read published state; none of them can surface a refresh
//! error. With the `openapi` feature the API is documented at `/docs`.

use crate::engine::{RefreshOutcome, RefreshPhase, TariffEngine};
use crate::error::FlexPriceError;
use crate::logging::mask_secret;
use crate::tariff::ProductKind;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[cfg(feature = "openapi")]
use utoipa::OpenApi;
#[cfg(feature = "openapi")]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TariffEngine>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusBody {
    pub version: &'static str,
    pub phase: RefreshPhase,
    pub cycle: u64,
    pub products: usize,
    pub hourly_prices: usize,
    pub products_refreshed_at: Option<DateTime<Utc>>,
    pub hourly_refreshed_at: Option<DateTime<Utc>>,
    pub refresh_interval_seconds: u64,
}

fn json_body<T: Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(bytes) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error":"serialization"})),
        )
            .into_response(),
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/health", responses(
    (status = 200, description = "Service is healthy")
)))]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/status", responses(
    (status = 200, description = "Refresh state", body = StatusBody)
)))]
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let engine = &state.engine;
    let published = engine.state();
    Json(StatusBody {
        version: env!("APP_VERSION"),
        phase: engine.phase(),
        cycle: published.cycle,
        products: published.products.len(),
        hourly_prices: published.hourly.len(),
        products_refreshed_at: published.products_refreshed_at,
        hourly_refreshed_at: published.hourly_refreshed_at,
        refresh_interval_seconds: engine
            .settings()
            .current()
            .source
            .refresh_interval()
            .as_secs(),
    })
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/v1/data", responses(
    (status = 200, description = "Raw tariff snapshot", body = [crate::tariff::TariffProduct])
)))]
async fn data(State(state): State<AppState>) -> Response {
    json_body(state.engine.snapshot().as_slice())
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/v1/evcc", responses(
    (status = 200, description = "Electricity prices in EVCC format", body = [crate::tariff::HourlyPrice])
)))]
async fn evcc(State(state): State<AppState>) -> Response {
    json_body(state.engine.derived_view().as_slice())
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/v1/now/electricity", responses(
    (status = 200, description = "Current electricity price, 999 when unknown", body = f64)
)))]
async fn now_electricity(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.current_value(ProductKind::Electricity.code()))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/v1/now/gas", responses(
    (status = 200, description = "Current gas price, 999 when unknown", body = f64)
)))]
async fn now_gas(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.current_value(ProductKind::Gas.code()))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/config", responses(
    (status = 200, description = "Effective configuration, API key masked")
)))]
async fn get_config(State(state): State<AppState>) -> Response {
    let mut config = state.engine.settings().current().as_ref().clone();
    config.source.known_api_key = mask_secret(&config.source.known_api_key);
    json_body(&config)
}

#[cfg(feature = "openapi")]
#[utoipa::path(get, path = "/api/config/schema", responses((status = 200)))]
async fn get_config_schema() -> Response {
    json_body(&schemars::schema_for!(crate::config::Config))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/api/refresh", responses(
    (status = 200, description = "Refresh ran", body = RefreshOutcome),
    (status = 409, description = "A refresh was already running", body = RefreshOutcome)
)))]
async fn trigger_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.engine.refresh().await;
    let code = match outcome {
        RefreshOutcome::Skipped => StatusCode::CONFLICT,
        _ => StatusCode::OK,
    };
    (code, Json(outcome))
}

#[cfg(feature = "openapi")]
#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        status,
        data,
        evcc,
        now_electricity,
        now_gas,
        get_config,
        get_config_schema,
        trigger_refresh
    ),
    components(schemas(
        StatusBody,
        RefreshPhase,
        RefreshOutcome,
        crate::tariff::TariffProduct,
        crate::tariff::TariffPeriod,
        crate::tariff::Detail,
        crate::tariff::AverageTariff,
        crate::tariff::HourlyPrice
    )),
    tags((name = "flexprice", description = "Dynamic tariff API"))
)]
pub struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/v1/data", get(data))
        .route("/v1/evcc", get(evcc))
        .route("/v1/now/electricity", get(now_electricity))
        .route("/v1/now/gas", get(now_gas))
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/config", get(get_config))
        .route("/api/refresh", post(trigger_refresh));

    #[cfg(feature = "openapi")]
    let router = router
        .route("/api/config/schema", get(get_config_schema))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    let router = router
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    #[cfg(feature = "compression")]
    let router = router.layer(tower_http::compression::CompressionLayer::new());

    router
}

/// Serve until `shutdown` flips to true
pub async fn serve(
    engine: Arc<TariffEngine>,
    host: &str,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let router = build_router(AppState { engine });
    let logger = crate::logging::get_logger("web");

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!(
                "Invalid host '{}', falling back to 127.0.0.1",
                host
            ));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| FlexPriceError::web(format!("failed to bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{} (data /v1, API /api)",
        local_addr
    ));

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .map_err(|e| FlexPriceError::web(e.to_string()))?;
    logger.info("Web server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Result;
    use crate::http::{HttpRequest, HttpResponse, HttpTransport};
    use crate::settings::SettingsStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct Offline;

    #[async_trait]
    impl HttpTransport for Offline {
        async fn get(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Err(FlexPriceError::network("offline"))
        }
    }

    fn router() -> Router {
        let mut cfg = Config::default();
        cfg.source.use_known_values = true;
        let engine = TariffEngine::new(SettingsStore::new(cfg), Arc::new(Offline)).unwrap();
        build_router(AppState {
            engine: Arc::new(engine),
        })
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_ok() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_cache_serves_empty_arrays_and_sentinels() {
        let (status, body) = get_json(router(), "/v1/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (_, body) = get_json(router(), "/v1/evcc").await;
        assert_eq!(body, serde_json::json!([]));

        let (_, body) = get_json(router(), "/v1/now/electricity").await;
        assert_eq!(body, serde_json::json!(999.0));

        let (_, body) = get_json(router(), "/v1/now/gas").await;
        assert_eq!(body, serde_json::json!(999.0));
    }

    #[tokio::test]
    async fn status_reports_idle_engine() {
        let (status, body) = get_json(router(), "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "idle");
        assert_eq!(body["cycle"], 0);
        assert_eq!(body["refresh_interval_seconds"], 60);
        assert!(body["products_refreshed_at"].is_null());
    }

    #[tokio::test]
    async fn config_endpoint_masks_the_key() {
        let mut cfg = Config::default();
        cfg.source.use_known_values = true;
        cfg.source.known_api_key = "abcdef123456".to_string();
        let engine = TariffEngine::new(SettingsStore::new(cfg), Arc::new(Offline)).unwrap();
        let router = build_router(AppState {
            engine: Arc::new(engine),
        });
        let (status, body) = get_json(router, "/api/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"]["known_api_key"], "********3456");
        assert_eq!(body["web"]["port"], 8080);
    }

    #[tokio::test]
    async fn serve_reports_bind_failure_as_web_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let mut cfg = Config::default();
        cfg.source.use_known_values = true;
        let engine = TariffEngine::new(SettingsStore::new(cfg), Arc::new(Offline)).unwrap();
        let (_tx, rx) = watch::channel(false);

        let err = serve(Arc::new(engine), "127.0.0.1", port, rx)
            .await
            .unwrap_err();
        let err = err.downcast_ref::<FlexPriceError>().unwrap();
        assert!(matches!(err, FlexPriceError::Web { .. }));
        assert!(err.to_string().contains("failed to bind 127.0.0.1:"));
    }

    #[tokio::test]
    async fn manual_refresh_reports_failure_without_erroring() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["outcome"], "failed");
    }
}
