use serde::{Deserialize, Serialize};

use crate::models::{ComponentBreakdown, RiskScoreResult, RiskTier};
use crate::utils::time::format_timestamp;

const STRONG_LIQUIDITY_USD: f64 = 100_000_000.0;
const STABLE_24H_PCT: f64 = 10.0;
const MODERATE_24H_PCT: f64 = 25.0;
const STABLE_7D_PCT: f64 = 15.0;
const STRONG_AUDIT_SCORE: f64 = 0.8;

/// Plain-language account of one score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskExplanation {
    pub protocol_id: String,
    pub score: f64,
    pub tier: RiskTier,
    pub observations: Vec<String>,
    pub summary: String,
    pub breakdown: Vec<ComponentBreakdown>,
    pub liquidity_tier: String,
    pub data_as_of: String,
    pub warnings: Vec<String>,
}

/// Turns a score into the observations shown next to it.
#[derive(Debug, Clone, Default)]
pub struct RiskExplainabilityService;

impl RiskExplainabilityService {
    pub fn new() -> Self {
        Self
    }

    pub fn explain(&self, result: &RiskScoreResult) -> RiskExplanation {
        let tvl = result.liquidity.tvl_usd;
        let change_24h = result.volatility.change_24h_pct.abs();
        let change_7d = result.volatility.change_7d_pct.abs();

        let liquidity_note = if tvl >= STRONG_LIQUIDITY_USD {
            "High liquidity indicates strong confidence and lower liquidity risk."
        } else {
            "Moderate liquidity may indicate some liquidity risk."
        };
        let daily_note = if change_24h < STABLE_24H_PCT {
            "Recent price movement is relatively stable."
        } else if change_24h < MODERATE_24H_PCT {
            "Recent price movement introduces moderate market risk."
        } else {
            "High volatility indicates elevated market risk."
        };
        let weekly_note = if change_7d < STABLE_7D_PCT {
            "Weekly price movement shows stability."
        } else {
            "Weekly volatility indicates ongoing market uncertainty."
        };
        let audit_note = if result.audit_score >= STRONG_AUDIT_SCORE {
            "Strong security posture reduces protocol risk."
        } else {
            "Moderate audit quality requires additional scrutiny."
        };

        let observations = vec![
            format!("TVL of ${} -> {}", group_thousands(tvl), liquidity_note),
            format!("24h volatility of {:.2}% -> {}", change_24h, daily_note),
            format!("7d volatility of {:.2}% -> {}", change_7d, weekly_note),
            format!("Audit score of {:.2} -> {}", result.audit_score, audit_note),
        ];

        let level = match result.tier {
            RiskTier::Low => "low",
            RiskTier::Moderate => "moderate",
            RiskTier::High => "elevated",
        };
        let summary = format!(
            "The combined risk score of {:.1} for {} suggests that current risk is {}.",
            result.score, result.display_name, level
        );

        let data_as_of = format_timestamp(result.liquidity.fetched_at.min(result.volatility.fetched_at));

        RiskExplanation {
            protocol_id: result.protocol_id.clone(),
            score: result.score,
            tier: result.tier,
            observations,
            summary,
            breakdown: result.breakdown(),
            liquidity_tier: result.components.liquidity_tier.label().to_string(),
            data_as_of,
            warnings: result.warnings(),
        }
    }
}

/// `1234567.8` -> `1,234,568`
fn group_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.max(0.0));
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
