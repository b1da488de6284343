pub mod health;
pub mod risk;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::RiskGaugeService;
use crate::utils::metrics::GaugeMetrics;

pub use health::{health_check, metrics_handler};
pub use risk::{
    compare_protocols, get_explanation, get_risk_score, get_scenarios, get_tvl_history, list_protocols,
};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RiskGaugeService>,
    pub metrics: GaugeMetrics,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/protocols", get(list_protocols))
        .route("/api/v1/protocols/:id/risk", get(get_risk_score))
        .route("/api/v1/protocols/:id/tvl-history", get(get_tvl_history))
        .route("/api/v1/protocols/:id/scenarios", get(get_scenarios))
        .route("/api/v1/protocols/:id/explanation", get(get_explanation))
        .route("/api/v1/compare", get(compare_protocols))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
