use tracing::info;

use crate::models::{
    LiquidityReading, ProtocolConfig, RiskComponents, RiskScoreResult, RiskTier, VolatilityReading,
    VolatilityScenario, MAX_RISK_SCORE, MIN_RISK_SCORE,
};
use crate::services::risk_normalizer::market_risk_factor;

/// Volatility multipliers used for the shock table.
pub const VOLATILITY_SHOCK_MULTIPLIERS: [f64; 5] = [0.5, 1.0, 1.5, 2.0, 3.0];

/// Combines normalized factors under the fixed weights.
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer;

impl CompositeScorer {
    pub fn new() -> Self {
        Self
    }

    /// Weighted score in [0, 100].
    pub fn composite_score(&self, components: &RiskComponents) -> f64 {
        let w = &components.weights;
        let raw = MAX_RISK_SCORE
            * (w.market * components.market_risk_factor
                + w.liquidity * components.liquidity_risk_factor
                + w.protocol * components.protocol_risk_factor);

        if raw.is_nan() {
            return MAX_RISK_SCORE;
        }
        raw.clamp(MIN_RISK_SCORE, MAX_RISK_SCORE)
    }

    pub fn score(
        &self,
        protocol: &ProtocolConfig,
        components: RiskComponents,
        liquidity: LiquidityReading,
        volatility: VolatilityReading,
    ) -> RiskScoreResult {
        let score = self.composite_score(&components);
        let tier = RiskTier::from_score(score);

        info!(
            protocol = %protocol.id,
            score = %format!("{:.2}", score),
            tier = tier.label(),
            market_points = %format!("{:.2}", components.market_risk_factor * components.weights.market * MAX_RISK_SCORE),
            liquidity_points = %format!("{:.2}", components.liquidity_risk_factor * components.weights.liquidity * MAX_RISK_SCORE),
            protocol_points = %format!("{:.2}", components.protocol_risk_factor * components.weights.protocol * MAX_RISK_SCORE),
            "Risk score calculated"
        );

        RiskScoreResult {
            protocol_id: protocol.id.clone(),
            display_name: protocol.display_name.clone(),
            score,
            tier,
            audit_score: protocol.audit_score,
            components,
            liquidity,
            volatility,
        }
    }

    /// Re-score `result` with its composite volatility scaled by each shock
    /// multiplier, holding liquidity and audit fixed.
    pub fn volatility_scenarios(&self, result: &RiskScoreResult) -> Vec<VolatilityScenario> {
        let base_volatility = result.volatility.composite_volatility;

        VOLATILITY_SHOCK_MULTIPLIERS
            .iter()
            .map(|&multiplier| {
                let composite_volatility = base_volatility * multiplier;
                let shocked = RiskComponents {
                    market_risk_factor: market_risk_factor(composite_volatility),
                    ..result.components
                };
                let score = self.composite_score(&shocked);
                VolatilityScenario {
                    multiplier,
                    composite_volatility,
                    score,
                    tier: RiskTier::from_score(score),
                }
            })
            .collect()
    }
}
