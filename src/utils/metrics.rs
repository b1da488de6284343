use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::AppError;

/// Prometheus collectors for the scoring pipeline. Each instance owns its
/// registry.
#[derive(Clone)]
pub struct GaugeMetrics {
    registry: Registry,
    pub upstream_requests: IntCounterVec,
    pub cache_lookups: IntCounterVec,
    pub risk_score_duration: Histogram,
    pub degraded_results: IntCounter,
}

impl GaugeMetrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();

        let upstream_requests = IntCounterVec::new(
            Opts::new("upstream_requests_total", "Provider requests by outcome"),
            &["provider", "outcome"],
        )?;
        let cache_lookups = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Reading cache lookups by result"),
            &["cache", "result"],
        )?;
        let risk_score_duration = Histogram::with_opts(
            HistogramOpts::new("risk_score_duration_seconds", "End-to-end risk score latency")
                .buckets(vec![0.005, 0.05, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]),
        )?;
        let degraded_results = IntCounter::new(
            "degraded_results_total",
            "Risk scores computed from at least one degraded reading",
        )?;

        registry.register(Box::new(upstream_requests.clone()))?;
        registry.register(Box::new(cache_lookups.clone()))?;
        registry.register(Box::new(risk_score_duration.clone()))?;
        registry.register(Box::new(degraded_results.clone()))?;

        Ok(Self {
            registry,
            upstream_requests,
            cache_lookups,
            risk_score_duration,
            degraded_results,
        })
    }

    pub fn record_upstream(&self, provider: &str, outcome: &str) {
        self.upstream_requests.with_label_values(&[provider, outcome]).inc();
    }

    pub fn record_cache_lookup(&self, cache: &str, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups.with_label_values(&[cache, result]).inc();
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, AppError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| AppError::InternalError(format!("metrics not utf-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_series() {
        let metrics = GaugeMetrics::new().unwrap();
        metrics.record_upstream("defillama", "ok");
        metrics.record_cache_lookup("liquidity", true);
        metrics.degraded_results.inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("upstream_requests_total{outcome=\"ok\",provider=\"defillama\"} 1"));
        assert!(text.contains("cache_lookups_total{cache=\"liquidity\",result=\"hit\"} 1"));
        assert!(text.contains("degraded_results_total 1"));
    }
}
