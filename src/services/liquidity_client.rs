use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::LiquidityProviderSettings;
use crate::error::{AppError, DegradationReason};
use crate::models::{LiquidityReading, TvlHistory, TvlPoint};
use crate::services::provider_http::{as_finite_f64, build_client, get_json, outcome_label};
use crate::services::traits::LiquiditySource;
use crate::utils::metrics::GaugeMetrics;
use crate::utils::time::from_unix_timestamp;

const PROVIDER: &str = "defillama";

/// `currentChainTvls` keys that are not part of the headline total.
const NON_CANONICAL_TVL_KEYS: [&str; 9] = [
    "borrowed",
    "staking",
    "pool2",
    "vesting",
    "treasury",
    "offers",
    "doublecounted",
    "liquidstaking",
    "dcAndLsOverlap",
];

/// Client for the DefiLlama protocol endpoint.
pub struct DefiLlamaClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    metrics: Option<GaugeMetrics>,
}

impl DefiLlamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            metrics: None,
        })
    }

    pub fn from_settings(settings: &LiquidityProviderSettings) -> Result<Self, AppError> {
        Self::new(&settings.base_url, Duration::from_secs(settings.timeout_seconds))
    }

    pub fn with_metrics(mut self, metrics: GaugeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn fetch_protocol(&self, slug: &str) -> Result<Value, DegradationReason> {
        let url = format!("{}/protocol/{}", self.base_url, slug);
        let result = get_json(&self.client, PROVIDER, &url, &[], &[], self.timeout).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_upstream(PROVIDER, outcome_label(&result));
        }

        result.map_err(|e| {
            warn!(slug, error = %e, "Liquidity provider request failed");
            DegradationReason::from(&e)
        })
    }
}

#[async_trait]
impl LiquiditySource for DefiLlamaClient {
    async fn fetch_current_tvl(&self, source_key: &str) -> LiquidityReading {
        info!(slug = source_key, "Fetching TVL");

        let parsed = match self.fetch_protocol(source_key).await {
            Ok(body) => parse_current_tvl(&body),
            Err(reason) => Err(reason),
        };

        match parsed {
            Ok(tvl) => {
                info!(slug = source_key, tvl_usd = tvl, "Fetched TVL");
                LiquidityReading::live(source_key, tvl)
            }
            Err(reason) => {
                warn!(slug = source_key, reason = %reason, "Using degraded TVL reading");
                LiquidityReading::degraded(source_key, reason)
            }
        }
    }

    async fn fetch_history(&self, source_key: &str, window: Option<chrono::Duration>) -> TvlHistory {
        info!(slug = source_key, "Fetching TVL history");

        let parsed = match self.fetch_protocol(source_key).await {
            Ok(body) => parse_tvl_history(&body),
            Err(reason) => Err(reason),
        };

        match parsed {
            Ok(points) => {
                info!(slug = source_key, points = points.len(), "Fetched TVL history");
                let history = TvlHistory {
                    source_key: source_key.to_string(),
                    points,
                    fetched_at: Utc::now(),
                    degraded: None,
                };
                match window {
                    Some(window) => TvlHistory {
                        points: history.trailing(window),
                        ..history
                    },
                    None => history,
                }
            }
            Err(reason) => {
                warn!(slug = source_key, reason = %reason, "TVL history unavailable");
                TvlHistory::degraded(source_key, reason)
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Headline TVL from a `/protocol/{slug}` body.
///
/// Order of preference: last sample of the `tvl` series, a numeric `tvl`,
/// then the sum of plain chain entries in `currentChainTvls`. A `tvl` that is
/// present but not a number is malformed rather than missing.
pub fn parse_current_tvl(body: &Value) -> Result<f64, DegradationReason> {
    let tvl = match body.get("tvl") {
        Some(Value::Array(series)) if !series.is_empty() => series
            .last()
            .and_then(|sample| sample.get("totalLiquidityUSD"))
            .ok_or_else(|| DegradationReason::MissingField("totalLiquidityUSD".to_string()))
            .and_then(|value| as_finite_f64(value).ok_or(DegradationReason::MalformedData))?,
        None | Some(Value::Null) | Some(Value::Array(_)) => {
            sum_chain_tvls(body).ok_or_else(|| DegradationReason::MissingField("tvl".to_string()))?
        }
        Some(value) => as_finite_f64(value).ok_or(DegradationReason::MalformedData)?,
    };

    if tvl < 0.0 {
        return Err(DegradationReason::MalformedData);
    }
    Ok(tvl)
}

fn sum_chain_tvls(body: &Value) -> Option<f64> {
    let chains = body.get("currentChainTvls")?.as_object()?;
    let canonical: Vec<f64> = chains
        .iter()
        .filter(|(name, _)| !name.contains('-') && !NON_CANONICAL_TVL_KEYS.contains(&name.as_str()))
        .filter_map(|(_, value)| as_finite_f64(value))
        .collect();

    if canonical.is_empty() {
        None
    } else {
        Some(canonical.iter().sum())
    }
}

/// The `tvl` series as ordered points. Samples without a usable date or
/// value are skipped.
pub fn parse_tvl_history(body: &Value) -> Result<Vec<TvlPoint>, DegradationReason> {
    let series = body
        .get("tvl")
        .and_then(Value::as_array)
        .ok_or_else(|| DegradationReason::MissingField("tvl".to_string()))?;

    let mut points: Vec<TvlPoint> = series
        .iter()
        .filter_map(|sample| {
            let seconds = sample.get("date").and_then(as_finite_f64)?;
            let tvl_usd = sample.get("totalLiquidityUSD").and_then(as_finite_f64)?;
            let timestamp = from_unix_timestamp(seconds as i64)?;
            (tvl_usd >= 0.0).then_some(TvlPoint { timestamp, tvl_usd })
        })
        .collect();

    if points.is_empty() && !series.is_empty() {
        return Err(DegradationReason::MalformedData);
    }

    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}
