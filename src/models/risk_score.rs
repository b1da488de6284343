use serde::{Deserialize, Serialize};

use crate::models::{LiquidityReading, VolatilityReading};

pub const MARKET_RISK_WEIGHT: f64 = 0.40;
pub const LIQUIDITY_RISK_WEIGHT: f64 = 0.30;
pub const PROTOCOL_RISK_WEIGHT: f64 = 0.30;

pub const MIN_RISK_SCORE: f64 = 0.0;
pub const MAX_RISK_SCORE: f64 = 100.0;

/// Scores below this are `Low`.
pub const MODERATE_TIER_FLOOR: f64 = 30.0;
/// Scores at or above this are `High`.
pub const HIGH_TIER_FLOOR: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub market: f64,
    pub liquidity: f64,
    pub protocol: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            market: MARKET_RISK_WEIGHT,
            liquidity: LIQUIDITY_RISK_WEIGHT,
            protocol: PROTOCOL_RISK_WEIGHT,
        }
    }
}

/// Discrete TVL bands, deepest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityTier {
    /// >= $1B
    Deep,
    /// $100M - $1B
    Strong,
    /// $10M - $100M
    Moderate,
    /// $1M - $10M
    Thin,
    /// < $1M
    Shallow,
}

impl LiquidityTier {
    pub fn label(&self) -> &'static str {
        match self {
            LiquidityTier::Deep => "Deep (>= $1B)",
            LiquidityTier::Strong => "Strong ($100M - $1B)",
            LiquidityTier::Moderate => "Moderate ($10M - $100M)",
            LiquidityTier::Thin => "Thin ($1M - $10M)",
            LiquidityTier::Shallow => "Shallow (< $1M)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    /// Lower bounds are inclusive: 30.0 is `Moderate`, 60.0 is `High`.
    pub fn from_score(score: f64) -> Self {
        if score < MODERATE_TIER_FLOOR {
            RiskTier::Low
        } else if score < HIGH_TIER_FLOOR {
            RiskTier::Moderate
        } else {
            RiskTier::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Moderate => "Moderate Risk",
            RiskTier::High => "High Risk",
        }
    }
}

/// Normalized risk factors, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    pub market_risk_factor: f64,
    pub liquidity_risk_factor: f64,
    pub protocol_risk_factor: f64,
    pub liquidity_tier: LiquidityTier,
    pub weights: RiskWeights,
}

/// One weighted contribution to the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub component: String,
    pub factor: f64,
    pub weight: f64,
    /// Points contributed to the 0-100 score.
    pub points: f64,
    /// The factor on a 0-100 scale, before weighting.
    pub component_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScoreResult {
    pub protocol_id: String,
    pub display_name: String,
    pub score: f64,
    pub tier: RiskTier,
    pub audit_score: f64,
    pub components: RiskComponents,
    pub liquidity: LiquidityReading,
    pub volatility: VolatilityReading,
}

impl RiskScoreResult {
    pub fn is_degraded(&self) -> bool {
        self.liquidity.is_degraded() || self.volatility.is_degraded()
    }

    /// Human readable notes for every reading that is not live data.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(reason) = &self.liquidity.degraded {
            warnings.push(format!(
                "TVL for {} unavailable ({}); scored as $0",
                self.display_name, reason
            ));
        }
        if let Some(reason) = &self.volatility.degraded {
            warnings.push(format!(
                "Market data for {} incomplete ({}); missing volatility scored as 0%",
                self.display_name, reason
            ));
        }
        warnings
    }

    pub fn breakdown(&self) -> Vec<ComponentBreakdown> {
        let c = &self.components;
        [
            ("Market Risk", c.market_risk_factor, c.weights.market),
            ("Liquidity Risk", c.liquidity_risk_factor, c.weights.liquidity),
            ("Protocol Risk", c.protocol_risk_factor, c.weights.protocol),
        ]
        .into_iter()
        .map(|(name, factor, weight)| ComponentBreakdown {
            component: name.to_string(),
            factor,
            weight,
            points: factor * weight * MAX_RISK_SCORE,
            component_score: factor * MAX_RISK_SCORE,
        })
        .collect()
    }
}

/// Score recomputed under a scaled volatility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityScenario {
    pub multiplier: f64,
    pub composite_volatility: f64,
    pub score: f64,
    pub tier: RiskTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub protocol_id: String,
    pub display_name: String,
    pub score: f64,
    pub tier: RiskTier,
    pub tvl_usd: f64,
    pub change_24h_pct: f64,
    pub audit_score: f64,
    pub degraded: bool,
}

impl From<&RiskScoreResult> for ComparisonRow {
    fn from(result: &RiskScoreResult) -> Self {
        Self {
            protocol_id: result.protocol_id.clone(),
            display_name: result.display_name.clone(),
            score: result.score,
            tier: result.tier,
            tvl_usd: result.liquidity.tvl_usd,
            change_24h_pct: result.volatility.change_24h_pct,
            audit_score: result.audit_score,
            degraded: result.is_degraded(),
        }
    }
}
