use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DegradationReason;

/// Locked value for one protocol at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityReading {
    pub source_key: String,
    pub tvl_usd: f64,
    pub fetched_at: DateTime<Utc>,
    pub degraded: Option<DegradationReason>,
}

impl LiquidityReading {
    pub fn live(source_key: &str, tvl_usd: f64) -> Self {
        Self {
            source_key: source_key.to_string(),
            tvl_usd,
            fetched_at: Utc::now(),
            degraded: None,
        }
    }

    /// Zero TVL substituted for data that could not be obtained.
    pub fn degraded(source_key: &str, reason: DegradationReason) -> Self {
        Self {
            source_key: source_key.to_string(),
            tvl_usd: 0.0,
            fetched_at: Utc::now(),
            degraded: Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TvlPoint {
    pub timestamp: DateTime<Utc>,
    pub tvl_usd: f64,
}

/// Ordered TVL series, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvlHistory {
    pub source_key: String,
    pub points: Vec<TvlPoint>,
    pub fetched_at: DateTime<Utc>,
    pub degraded: Option<DegradationReason>,
}

impl TvlHistory {
    pub fn degraded(source_key: &str, reason: DegradationReason) -> Self {
        Self {
            source_key: source_key.to_string(),
            points: Vec::new(),
            fetched_at: Utc::now(),
            degraded: Some(reason),
        }
    }

    /// Points no older than `window` before the newest sample. A window
    /// reaching past the earliest representable instant keeps every point.
    pub fn trailing(&self, window: chrono::Duration) -> Vec<TvlPoint> {
        let Some(last) = self.points.last() else {
            return Vec::new();
        };
        let Some(cutoff) = last.timestamp.checked_sub_signed(window) else {
            return self.points.clone();
        };
        self.points
            .iter()
            .filter(|p| p.timestamp >= cutoff)
            .copied()
            .collect()
    }

    /// Percentage change between the first and last sample of the series.
    pub fn change_pct(&self) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if first.tvl_usd <= 0.0 || self.points.len() < 2 {
            return None;
        }
        Some((last.tvl_usd - first.tvl_usd) / first.tvl_usd * 100.0)
    }
}

/// Spot market data and the volatility derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReading {
    pub source_key: String,
    /// Signed 24h price change in percent.
    pub change_24h_pct: f64,
    /// Signed 7d price change in percent.
    pub change_7d_pct: f64,
    /// Blended magnitude used as the market risk input, always >= 0.
    pub composite_volatility: f64,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub fetched_at: DateTime<Utc>,
    pub degraded: Option<DegradationReason>,
}

impl VolatilityReading {
    pub fn degraded(source_key: &str, reason: DegradationReason) -> Self {
        Self {
            source_key: source_key.to_string(),
            change_24h_pct: 0.0,
            change_7d_pct: 0.0,
            composite_volatility: 0.0,
            price_usd: 0.0,
            market_cap_usd: 0.0,
            fetched_at: Utc::now(),
            degraded: Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}
