use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::{ComparisonSettings, Settings};
use crate::error::AppError;
use crate::models::{ComparisonRow, ProtocolConfig, RiskScoreResult, TvlHistory, VolatilityScenario};
use crate::services::liquidity_client::DefiLlamaClient;
use crate::services::market_data_client::CoinGeckoClient;
use crate::services::protocol_registry::ProtocolRegistry;
use crate::services::risk_explainability_service::{RiskExplainabilityService, RiskExplanation};
use crate::services::risk_normalizer::RiskNormalizer;
use crate::services::risk_scorer::CompositeScorer;
use crate::services::traits::{LiquiditySource, MarketDataSource};
use crate::utils::caching::{CacheKey, CacheManager, DataSource};
use crate::utils::metrics::GaugeMetrics;

/// Resolves a protocol, gathers both readings through the caches and scores
/// them.
pub struct RiskGaugeService {
    registry: Arc<ProtocolRegistry>,
    liquidity: Arc<dyn LiquiditySource>,
    market: Arc<dyn MarketDataSource>,
    cache: Arc<CacheManager>,
    normalizer: RiskNormalizer,
    scorer: CompositeScorer,
    explainer: RiskExplainabilityService,
    comparison: ComparisonSettings,
    metrics: Option<GaugeMetrics>,
}

impl RiskGaugeService {
    pub fn new(
        registry: Arc<ProtocolRegistry>,
        liquidity: Arc<dyn LiquiditySource>,
        market: Arc<dyn MarketDataSource>,
        cache: Arc<CacheManager>,
        comparison: ComparisonSettings,
    ) -> Self {
        Self {
            registry,
            liquidity,
            market,
            cache,
            normalizer: RiskNormalizer::new(),
            scorer: CompositeScorer::new(),
            explainer: RiskExplainabilityService::new(),
            comparison,
            metrics: None,
        }
    }

    /// Production wiring: default registry, HTTP clients and caches built
    /// from `settings`, all reporting into `metrics`.
    pub fn from_settings(settings: &Settings, metrics: GaugeMetrics) -> Result<Self, AppError> {
        let liquidity = DefiLlamaClient::from_settings(&settings.liquidity_provider)?.with_metrics(metrics.clone());
        let market = CoinGeckoClient::from_settings(&settings.market_provider)?.with_metrics(metrics.clone());
        let cache = CacheManager::new(&settings.cache).with_metrics(&metrics);

        info!(
            liquidity_provider = liquidity.provider_name(),
            market_provider = market.provider_name(),
            "Risk gauge service initialized"
        );

        Ok(Self::new(
            Arc::new(ProtocolRegistry::default()),
            Arc::new(liquidity),
            Arc::new(market),
            Arc::new(cache),
            settings.comparison.clone(),
        )
        .with_metrics(metrics))
    }

    pub fn with_metrics(mut self, metrics: GaugeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Score one protocol. Only an unknown identifier fails; provider
    /// trouble shows up as degraded readings on the result.
    pub async fn compute_risk_score(&self, protocol_id: &str) -> Result<RiskScoreResult, AppError> {
        let protocol = self.registry.resolve(protocol_id)?;
        Ok(self.score_protocol(protocol).await)
    }

    async fn score_protocol(&self, protocol: &ProtocolConfig) -> RiskScoreResult {
        let started = Instant::now();
        let liquidity_key = CacheKey::new(DataSource::Liquidity, &protocol.liquidity_slug);
        let market_key = CacheKey::new(DataSource::MarketData, &protocol.market_id);

        let (liquidity, volatility) = tokio::join!(
            self.cache.liquidity.get_or_fetch_default(liquidity_key, || {
                self.liquidity.fetch_current_tvl(&protocol.liquidity_slug)
            }),
            self.cache.market.get_or_fetch_default(market_key, || {
                self.market.fetch_volatility(&protocol.market_id)
            }),
        );

        let components = self.normalizer.normalize(&liquidity, &volatility, protocol.audit_score);
        let result = self.scorer.score(protocol, components, liquidity, volatility);

        if result.is_degraded() {
            warn!(
                protocol = %protocol.id,
                warnings = ?result.warnings(),
                "Risk score computed from degraded data"
            );
            if let Some(metrics) = &self.metrics {
                metrics.degraded_results.inc();
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.risk_score_duration.observe(started.elapsed().as_secs_f64());
        }

        result
    }

    /// TVL series for a protocol. The full series is cached, the trailing
    /// window is applied per call.
    pub async fn tvl_history(
        &self,
        protocol_id: &str,
        window: Option<chrono::Duration>,
    ) -> Result<TvlHistory, AppError> {
        let protocol = self.registry.resolve(protocol_id)?;
        let key = CacheKey::new(DataSource::LiquidityHistory, &protocol.liquidity_slug);

        let history = self
            .cache
            .history
            .get_or_fetch_default(key, || self.liquidity.fetch_history(&protocol.liquidity_slug, None))
            .await;

        Ok(match window {
            Some(window) => TvlHistory {
                points: history.trailing(window),
                ..history
            },
            None => history,
        })
    }

    pub async fn volatility_scenarios(&self, protocol_id: &str) -> Result<Vec<VolatilityScenario>, AppError> {
        let result = self.compute_risk_score(protocol_id).await?;
        Ok(self.scorer.volatility_scenarios(&result))
    }

    pub async fn explain(&self, protocol_id: &str) -> Result<RiskExplanation, AppError> {
        let result = self.compute_risk_score(protocol_id).await?;
        Ok(self.explainer.explain(&result))
    }

    /// Score several protocols one after another and rank them, safest
    /// first. Every identifier is resolved before any provider is called.
    pub async fn compare_protocols(&self, protocol_ids: &[String]) -> Result<Vec<ComparisonRow>, AppError> {
        if protocol_ids.is_empty() {
            return Err(AppError::ValidationError("at least one protocol is required".to_string()));
        }

        let mut seen = HashSet::new();
        let mut protocols = Vec::with_capacity(protocol_ids.len());
        for id in protocol_ids {
            let protocol = self.registry.resolve(id)?;
            if seen.insert(protocol.id.as_str()) {
                protocols.push(protocol);
            }
        }
        // The limit counts distinct protocols, not raw identifiers.
        if protocols.len() > self.comparison.max_protocols {
            return Err(AppError::ValidationError(format!(
                "at most {} protocols can be compared",
                self.comparison.max_protocols
            )));
        }

        info!(count = protocols.len(), "Comparing protocols");

        let delay = self.comparison.inter_protocol_delay();
        let mut rows = Vec::with_capacity(protocols.len());
        for (i, protocol) in protocols.into_iter().enumerate() {
            if i > 0 && delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            let result = self.score_protocol(protocol).await;
            rows.push(ComparisonRow::from(&result));
        }

        rows.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.protocol_id.cmp(&b.protocol_id)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheSettings;
    use crate::error::DegradationReason;
    use crate::models::{LiquidityReading, ProtocolConfig, VolatilityReading};
    use async_trait::async_trait;

    struct FixedLiquidity(f64);

    #[async_trait]
    impl LiquiditySource for FixedLiquidity {
        async fn fetch_current_tvl(&self, source_key: &str) -> LiquidityReading {
            LiquidityReading::live(source_key, self.0)
        }

        async fn fetch_history(&self, source_key: &str, _window: Option<chrono::Duration>) -> TvlHistory {
            TvlHistory::degraded(source_key, DegradationReason::Timeout)
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FixedMarket(f64);

    #[async_trait]
    impl MarketDataSource for FixedMarket {
        async fn fetch_volatility(&self, market_key: &str) -> VolatilityReading {
            let mut reading = VolatilityReading::degraded(market_key, DegradationReason::Timeout);
            reading.degraded = None;
            reading.composite_volatility = self.0;
            reading
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    fn service(max_protocols: usize) -> RiskGaugeService {
        let registry = ProtocolRegistry::new(vec![
            ProtocolConfig::new("aave", "Aave", "aave", "aave", 0.85, ""),
            ProtocolConfig::new("yearn", "Yearn", "yearn", "yearn", 0.75, ""),
        ])
        .unwrap();
        RiskGaugeService::new(
            Arc::new(registry),
            Arc::new(FixedLiquidity(5_000_000_000.0)),
            Arc::new(FixedMarket(2.45)),
            Arc::new(CacheManager::new(&CacheSettings::default())),
            ComparisonSettings {
                inter_protocol_delay_ms: 0,
                max_protocols,
            },
        )
    }

    #[tokio::test]
    async fn test_unknown_protocol_is_not_found() {
        let err = service(8).compute_risk_score("nope").await.unwrap_err();
        assert_eq!(err, AppError::NotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_comparison_is_sorted_and_deduplicated() {
        let ids = vec!["yearn".to_string(), "Aave".to_string(), "aave".to_string()];
        let rows = service(8).compare_protocols(&ids).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].protocol_id, "aave");
        assert_eq!(rows[1].protocol_id, "yearn");
        assert!(rows[0].score <= rows[1].score);
    }

    #[tokio::test]
    async fn test_comparison_limits() {
        assert!(matches!(
            service(8).compare_protocols(&[]).await,
            Err(AppError::ValidationError(_))
        ));
        let ids = vec!["aave".to_string(), "yearn".to_string()];
        assert!(matches!(
            service(1).compare_protocols(&ids).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_repeated_identifier_counts_once_against_limit() {
        let ids = vec!["aave".to_string(); 9];
        let rows = service(1).compare_protocols(&ids).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].protocol_id, "aave");

        let ids = vec!["aave".to_string(), " AAVE ".to_string(), "yearn".to_string()];
        assert_eq!(service(2).compare_protocols(&ids).await.unwrap().len(), 2);
    }
}
