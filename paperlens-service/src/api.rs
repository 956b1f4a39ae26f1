//! HTTP API for the PaperLens service.
//!
//! This module provides the REST API endpoints for:
//! - Full paper analysis (`POST /api/pdf`)
//! - Quick paper summaries (`POST /api/analyze-pdf`)
//! - Health and metrics monitoring

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::CacheStats;
use crate::service::AnalysisService;

pub mod analysis;
pub mod upload;
use analysis::{report_handler, summary_handler};

/// Application state
pub struct AppState {
    pub service: Arc<AnalysisService>,
    pub start_time: Instant,
    /// Prometheus recorder handle, absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn max_upload_bytes(&self) -> u64 {
        self.service.config.limits.max_upload_bytes
    }
}

/// Build the API router
pub fn router(service: Arc<AnalysisService>, metrics: Option<PrometheusHandle>) -> Router {
    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
        metrics,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_body_size = usize::try_from(state.max_upload_bytes()).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .route("/pdf", post(report_handler))
        .route("/analyze-pdf", post(summary_handler))
        .layer(DefaultBodyLimit::max(max_body_size));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        report_cache: state.service.report_cache.stats(),
        summary_cache: state.service.summary_cache.stats(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    report_cache: CacheStats,
    summary_cache: CacheStats,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics recorder not installed",
        )
            .into_response(),
    }
}
