use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::MarketProviderSettings;
use crate::error::{AppError, DegradationReason};
use crate::models::VolatilityReading;
use crate::services::provider_http::{as_finite_f64, build_client, get_json, outcome_label};
use crate::services::traits::MarketDataSource;
use crate::utils::metrics::GaugeMetrics;

const PROVIDER: &str = "coingecko";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Weight of the absolute 24h move in the composite.
pub const VOLATILITY_24H_WEIGHT: f64 = 0.7;
/// Weight of the absolute 7d move, applied after scaling it to a daily rate.
pub const VOLATILITY_7D_WEIGHT: f64 = 0.3;
pub const DAYS_PER_WEEK: f64 = 7.0;

const COIN_QUERY: [(&str, &str); 6] = [
    ("localization", "false"),
    ("tickers", "false"),
    ("market_data", "true"),
    ("community_data", "false"),
    ("developer_data", "false"),
    ("sparkline", "false"),
];

/// `0.7 * |24h| + 0.3 * |7d| / 7`, always >= 0.
pub fn composite_volatility(change_24h_pct: f64, change_7d_pct: f64) -> f64 {
    VOLATILITY_24H_WEIGHT * change_24h_pct.abs()
        + VOLATILITY_7D_WEIGHT * change_7d_pct.abs() / DAYS_PER_WEEK
}

/// Client for the CoinGecko coin endpoint.
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    api_key: Option<String>,
    metrics: Option<GaugeMetrics>,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, timeout: Duration, api_key: Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            api_key,
            metrics: None,
        })
    }

    pub fn from_settings(settings: &MarketProviderSettings) -> Result<Self, AppError> {
        Self::new(
            &settings.base_url,
            Duration::from_secs(settings.timeout_seconds),
            settings.api_key.clone(),
        )
    }

    pub fn with_metrics(mut self, metrics: GaugeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_volatility(&self, market_key: &str) -> VolatilityReading {
        info!(coin_id = market_key, "Fetching market data");

        let url = format!("{}/coins/{}", self.base_url, market_key);
        let headers: Vec<(&str, &str)> = self
            .api_key
            .as_deref()
            .map(|key| vec![(API_KEY_HEADER, key)])
            .unwrap_or_default();

        let result = get_json(&self.client, PROVIDER, &url, &COIN_QUERY, &headers, self.timeout).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_upstream(PROVIDER, outcome_label(&result));
        }

        match result {
            Ok(body) => {
                let reading = parse_market_data(market_key, &body);
                match &reading.degraded {
                    None => info!(
                        coin_id = market_key,
                        change_24h = %format!("{:.2}", reading.change_24h_pct),
                        change_7d = %format!("{:.2}", reading.change_7d_pct),
                        composite = %format!("{:.2}", reading.composite_volatility),
                        price_usd = reading.price_usd,
                        market_cap_usd = reading.market_cap_usd,
                        "Fetched market data"
                    ),
                    Some(reason) => warn!(coin_id = market_key, reason = %reason, "Market data incomplete"),
                }
                reading
            }
            Err(e) => {
                warn!(coin_id = market_key, error = %e, "Market data request failed");
                VolatilityReading::degraded(market_key, DegradationReason::from(&e))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Decode a `/coins/{id}` body. A missing or non-numeric percentage field
/// counts as 0 and flags the reading; price and market cap default to 0
/// silently.
pub fn parse_market_data(market_key: &str, body: &Value) -> VolatilityReading {
    let Some(market_data) = body.get("market_data").filter(|v| v.is_object()) else {
        return VolatilityReading::degraded(market_key, DegradationReason::MissingField("market_data".to_string()));
    };

    let mut degraded = None;
    let mut change = |field: &str| -> f64 {
        match market_data.get(field) {
            None | Some(Value::Null) => {
                degraded.get_or_insert_with(|| DegradationReason::MissingField(field.to_string()));
                0.0
            }
            Some(raw) => as_finite_f64(raw).unwrap_or_else(|| {
                degraded.get_or_insert(DegradationReason::MalformedData);
                0.0
            }),
        }
    };
    let change_24h_pct = change("price_change_percentage_24h");
    let change_7d_pct = change("price_change_percentage_7d");

    VolatilityReading {
        source_key: market_key.to_string(),
        change_24h_pct,
        change_7d_pct,
        composite_volatility: composite_volatility(change_24h_pct, change_7d_pct),
        price_usd: usd_amount(market_data.get("current_price")),
        market_cap_usd: usd_amount(market_data.get("market_cap")),
        fetched_at: Utc::now(),
        degraded,
    }
}

/// Either `{"usd": n, ...}` or a bare number.
fn usd_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Object(by_currency)) => by_currency.get("usd").and_then(as_finite_f64),
        Some(other) => as_finite_f64(other),
        None => None,
    }
    .unwrap_or(0.0)
}
