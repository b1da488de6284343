use async_trait::async_trait;

use crate::models::{LiquidityReading, TvlHistory, VolatilityReading};

/// Provider of locked-value data.
///
/// Implementations never fail: network and decoding problems come back as
/// degraded readings.
#[async_trait]
pub trait LiquiditySource: Send + Sync {
    async fn fetch_current_tvl(&self, source_key: &str) -> LiquidityReading;

    /// TVL series, oldest first, limited to the trailing `window` when given.
    async fn fetch_history(&self, source_key: &str, window: Option<chrono::Duration>) -> TvlHistory;

    fn provider_name(&self) -> &'static str;
}

/// Provider of spot market data and price changes.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_volatility(&self, market_key: &str) -> VolatilityReading;

    fn provider_name(&self) -> &'static str;
}
