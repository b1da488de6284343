use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::handlers::AppState;
use crate::models::{ComparisonRow, ComponentBreakdown, ProtocolConfig, RiskScoreResult, TvlHistory, VolatilityScenario};
use crate::services::RiskExplanation;
use crate::utils::time::age_seconds;

/// Longest history window a caller may request.
const MAX_HISTORY_DAYS: i64 = 3650;

#[derive(Debug, Serialize)]
pub struct RiskScoreResponse {
    #[serde(flatten)]
    pub result: RiskScoreResult,
    pub tier_label: String,
    pub liquidity_tier: String,
    pub breakdown: Vec<ComponentBreakdown>,
    pub warnings: Vec<String>,
    /// Age of the older of the two readings.
    pub data_age_seconds: i64,
}

impl From<RiskScoreResult> for RiskScoreResponse {
    fn from(result: RiskScoreResult) -> Self {
        Self {
            tier_label: result.tier.label().to_string(),
            liquidity_tier: result.components.liquidity_tier.label().to_string(),
            breakdown: result.breakdown(),
            warnings: result.warnings(),
            data_age_seconds: age_seconds(result.liquidity.fetched_at.min(result.volatility.fetched_at)),
            result,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    /// Comma separated identifiers.
    pub ids: String,
}

#[derive(Debug, Serialize)]
pub struct TvlHistoryResponse {
    #[serde(flatten)]
    pub history: TvlHistory,
    /// First to last point of the returned window, in percent.
    pub change_pct: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ScenariosResponse {
    pub protocol_id: String,
    pub scenarios: Vec<VolatilityScenario>,
}

/// GET /api/v1/protocols
pub async fn list_protocols(State(state): State<AppState>) -> Json<Vec<ProtocolConfig>> {
    Json(state.service.registry().protocols().to_vec())
}

/// GET /api/v1/protocols/:id/risk
pub async fn get_risk_score(
    Path(protocol_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RiskScoreResponse>, AppError> {
    info!(protocol_id = %protocol_id, "Risk score requested");
    let result = state.service.compute_risk_score(&protocol_id).await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/protocols/:id/tvl-history?days=N
pub async fn get_tvl_history(
    Path(protocol_id): Path<String>,
    Query(params): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<TvlHistoryResponse>, AppError> {
    let window = match params.days {
        Some(days) if !(1..=MAX_HISTORY_DAYS).contains(&days) => {
            return Err(AppError::ValidationError(format!(
                "days must be between 1 and {}",
                MAX_HISTORY_DAYS
            )));
        }
        Some(days) => Some(chrono::Duration::days(days)),
        None => None,
    };

    let history = state.service.tvl_history(&protocol_id, window).await?;
    Ok(Json(TvlHistoryResponse {
        change_pct: history.change_pct(),
        history,
    }))
}

/// GET /api/v1/protocols/:id/scenarios
pub async fn get_scenarios(
    Path(protocol_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ScenariosResponse>, AppError> {
    let scenarios = state.service.volatility_scenarios(&protocol_id).await?;
    Ok(Json(ScenariosResponse {
        protocol_id,
        scenarios,
    }))
}

/// GET /api/v1/protocols/:id/explanation
pub async fn get_explanation(
    Path(protocol_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RiskExplanation>, AppError> {
    let explanation = state.service.explain(&protocol_id).await?;
    Ok(Json(explanation))
}

/// GET /api/v1/compare?ids=a,b,c
pub async fn compare_protocols(
    Query(params): Query<CompareQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ComparisonRow>>, AppError> {
    let ids: Vec<String> = params
        .ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    let rows = state.service.compare_protocols(&ids).await?;
    Ok(Json(rows))
}
