//! HTTP API for container status, liveness and Prometheus metrics

use crate::error::{panic_response, ApiError, ApiResult};
use crate::rate_limit::{rate_limit, RateLimiter};
use anyhow::Context;
use axum::{
    error_handling::HandleErrorLayer,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    BoxError, Json, Router, ServiceExt,
};
use serde::Serialize;
use status_lib::{Aggregator, StatusMetrics, StatusReport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, Layer, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub metrics: StatusMetrics,
    pub rate_limiter: RateLimiter,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        aggregator: Aggregator,
        metrics: StatusMetrics,
        rate_limiter: RateLimiter,
        request_timeout: Duration,
    ) -> Self {
        Self {
            aggregator,
            metrics,
            rate_limiter,
            request_timeout,
        }
    }
}

/// Liveness response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Container status report - 500 if the engine cannot list containers
async fn metrics(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatusReport>> {
    let report = state.aggregator.collect_all().await?;
    Ok(Json(report))
}

/// Liveness probe, independent of the engine
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Prometheus metrics of the exporter itself
async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let buffer = state
        .metrics
        .encode_text()
        .map_err(|e| ApiError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    ))
}

/// Map errors raised by the timeout layer to a JSON response
async fn handle_timeout_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(format!("Unhandled middleware error: {}", err))
    }
}

/// Create the API router with rate limiting, timeout and panic recovery
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/metrics/prometheus", get(prometheus_metrics))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(state.request_timeout)),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router with trailing slashes trimmed before routing
pub fn create_app(state: Arc<AppState>) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(create_router(state))
}

/// Start the API server, returning once `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_app(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server failed")?;

    Ok(())
}
