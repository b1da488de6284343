use tracing::debug;

use crate::models::{LiquidityReading, LiquidityTier, RiskComponents, RiskWeights, VolatilityReading};

pub const DEEP_LIQUIDITY_FLOOR_USD: f64 = 1_000_000_000.0;
pub const STRONG_LIQUIDITY_FLOOR_USD: f64 = 100_000_000.0;
pub const MODERATE_LIQUIDITY_FLOOR_USD: f64 = 10_000_000.0;
pub const THIN_LIQUIDITY_FLOOR_USD: f64 = 1_000_000.0;

pub const DEEP_LIQUIDITY_FACTOR: f64 = 0.1;
pub const STRONG_LIQUIDITY_FACTOR: f64 = 0.2;
pub const MODERATE_LIQUIDITY_FACTOR: f64 = 0.4;
pub const THIN_LIQUIDITY_FACTOR: f64 = 0.6;
pub const SHALLOW_LIQUIDITY_FACTOR: f64 = 0.9;

/// Converts raw readings into risk factors in [0, 1].
///
/// Pure and total: degraded readings go through the same math, their flags
/// only travel on the readings themselves.
#[derive(Debug, Clone, Default)]
pub struct RiskNormalizer {
    weights: RiskWeights,
}

impl RiskNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(
        &self,
        liquidity: &LiquidityReading,
        volatility: &VolatilityReading,
        audit_score: f64,
    ) -> RiskComponents {
        let liquidity_tier = liquidity_tier(liquidity.tvl_usd);
        let components = RiskComponents {
            market_risk_factor: market_risk_factor(volatility.composite_volatility),
            liquidity_risk_factor: liquidity_tier_factor(liquidity_tier),
            protocol_risk_factor: protocol_risk_factor(audit_score),
            liquidity_tier,
            weights: self.weights,
        };

        debug!(
            tvl_usd = liquidity.tvl_usd,
            liquidity_tier = liquidity_tier.label(),
            composite_volatility = volatility.composite_volatility,
            audit_score,
            market = components.market_risk_factor,
            liquidity = components.liquidity_risk_factor,
            protocol = components.protocol_risk_factor,
            "Normalized risk factors"
        );

        components
    }
}

/// TVL band, lower bounds inclusive. Non-finite or negative input falls in
/// the shallowest band.
pub fn liquidity_tier(tvl_usd: f64) -> LiquidityTier {
    if tvl_usd >= DEEP_LIQUIDITY_FLOOR_USD {
        LiquidityTier::Deep
    } else if tvl_usd >= STRONG_LIQUIDITY_FLOOR_USD {
        LiquidityTier::Strong
    } else if tvl_usd >= MODERATE_LIQUIDITY_FLOOR_USD {
        LiquidityTier::Moderate
    } else if tvl_usd >= THIN_LIQUIDITY_FLOOR_USD {
        LiquidityTier::Thin
    } else {
        LiquidityTier::Shallow
    }
}

pub fn liquidity_tier_factor(tier: LiquidityTier) -> f64 {
    match tier {
        LiquidityTier::Deep => DEEP_LIQUIDITY_FACTOR,
        LiquidityTier::Strong => STRONG_LIQUIDITY_FACTOR,
        LiquidityTier::Moderate => MODERATE_LIQUIDITY_FACTOR,
        LiquidityTier::Thin => THIN_LIQUIDITY_FACTOR,
        LiquidityTier::Shallow => SHALLOW_LIQUIDITY_FACTOR,
    }
}

pub fn liquidity_risk_factor(tvl_usd: f64) -> f64 {
    liquidity_tier_factor(liquidity_tier(tvl_usd))
}

/// Composite volatility percent / 100, saturating at 1.0.
pub fn market_risk_factor(composite_volatility: f64) -> f64 {
    if composite_volatility.is_nan() || composite_volatility <= 0.0 {
        return 0.0;
    }
    (composite_volatility / 100.0).min(1.0)
}

pub fn protocol_risk_factor(audit_score: f64) -> f64 {
    (1.0 - audit_score.clamp(0.0, 1.0)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DegradationReason;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_liquidity_tiers() {
        assert_eq!(liquidity_risk_factor(5_234_567_890.0), 0.1);
        assert_eq!(liquidity_risk_factor(1_000_000_000.0), 0.1);
        assert_eq!(liquidity_risk_factor(999_999_999.99), 0.2);
        assert_eq!(liquidity_risk_factor(100_000_000.0), 0.2);
        assert_eq!(liquidity_risk_factor(99_999_999.0), 0.4);
        assert_eq!(liquidity_risk_factor(10_000_000.0), 0.4);
        assert_eq!(liquidity_risk_factor(9_999_999.0), 0.6);
        assert_eq!(liquidity_risk_factor(1_000_000.0), 0.6);
        assert_eq!(liquidity_risk_factor(999_999.0), 0.9);
        assert_eq!(liquidity_risk_factor(0.0), 0.9);
    }

    #[test]
    fn test_market_factor_saturates() {
        assert_eq!(market_risk_factor(0.0), 0.0);
        assert!(close(market_risk_factor(25.0), 0.25));
        assert_eq!(market_risk_factor(100.0), 1.0);
        assert_eq!(market_risk_factor(150.0), 1.0);
        assert_eq!(market_risk_factor(f64::NAN), 0.0);
    }

    #[test]
    fn test_protocol_factor() {
        assert!(close(protocol_risk_factor(0.85), 0.15));
        assert_eq!(protocol_risk_factor(0.0), 1.0);
        assert_eq!(protocol_risk_factor(1.0), 0.0);
    }

    #[test]
    fn test_degraded_readings_use_same_math() {
        let normalizer = RiskNormalizer::new();
        let liquidity = LiquidityReading::degraded("aave", DegradationReason::Timeout);
        let volatility = VolatilityReading::degraded("aave", DegradationReason::Transport);

        let components = normalizer.normalize(&liquidity, &volatility, 0.85);
        assert_eq!(components.liquidity_risk_factor, SHALLOW_LIQUIDITY_FACTOR);
        assert_eq!(components.liquidity_tier, LiquidityTier::Shallow);
        assert_eq!(components.market_risk_factor, 0.0);
        assert!(close(components.protocol_risk_factor, 0.15));
        assert_eq!(components.weights, RiskWeights::default());
    }
}
