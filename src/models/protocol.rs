use serde::{Deserialize, Serialize};

/// Static description of one scored protocol and where its data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub id: String,
    pub display_name: String,
    /// Slug on the liquidity provider (`/protocol/{slug}`).
    pub liquidity_slug: String,
    /// Coin id on the market data provider (`/coins/{id}`).
    pub market_id: String,
    /// Audit quality in [0, 1], higher is safer.
    pub audit_score: f64,
    pub description: String,
}

impl ProtocolConfig {
    pub fn new(
        id: &str,
        display_name: &str,
        liquidity_slug: &str,
        market_id: &str,
        audit_score: f64,
        description: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            liquidity_slug: liquidity_slug.to_string(),
            market_id: market_id.to_string(),
            audit_score,
            description: description.to_string(),
        }
    }
}
