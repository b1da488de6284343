use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::AppError;
use crate::handlers::AppState;
use crate::utils::caching::CacheStats;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub protocols: usize,
    pub caches: Vec<CacheStats>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocols: state.service.registry().len(),
        caches: state.service.cache().get_all_stats().await,
    })
}

/// Prometheus text exposition.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    debug!("Serving Prometheus metrics");
    let body = state.metrics.render()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response())
}
