use std::time::Duration;

use defi_risk_gauge::{
    error::DegradationReason,
    services::{CoinGeckoClient, DefiLlamaClient, LiquiditySource, MarketDataSource},
    utils::metrics::GaugeMetrics,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn protocol_body() -> serde_json::Value {
    json!({
        "name": "Aave",
        "tvl": [
            {"date": 1_700_000_000, "totalLiquidityUSD": 4_900_000_000.0},
            {"date": 1_700_086_400, "totalLiquidityUSD": 5_100_000_000.0},
            {"date": 1_700_172_800, "totalLiquidityUSD": 5_234_567_890.0}
        ]
    })
}

fn coin_body() -> serde_json::Value {
    json!({
        "id": "aave",
        "market_data": {
            "price_change_percentage_24h": -2.1,
            "price_change_percentage_7d": 7.0,
            "current_price": {"usd": 95.5},
            "market_cap": {"usd": 1_400_000_000.0}
        }
    })
}

#[tokio::test]
async fn test_liquidity_client_reads_latest_tvl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/protocol/aave"))
        .and(header("user-agent", "DeFi-Risk-Gauge/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(protocol_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = DefiLlamaClient::new(&server.uri(), TIMEOUT).unwrap();
    let reading = client.fetch_current_tvl("aave").await;

    assert!(!reading.is_degraded());
    assert_eq!(reading.source_key, "aave");
    assert_eq!(reading.tvl_usd, 5_234_567_890.0);
}

#[tokio::test]
async fn test_liquidity_client_server_error_degrades_to_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/protocol/aave"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let metrics = GaugeMetrics::new().unwrap();
    let client = DefiLlamaClient::new(&server.uri(), TIMEOUT)
        .unwrap()
        .with_metrics(metrics.clone());
    let reading = client.fetch_current_tvl("aave").await;

    assert_eq!(reading.tvl_usd, 0.0);
    assert_eq!(reading.degraded, Some(DegradationReason::HttpStatus(500)));
    assert!(metrics
        .render()
        .unwrap()
        .contains("upstream_requests_total{outcome=\"http_error\",provider=\"defillama\"} 1"));
}

#[tokio::test]
async fn test_liquidity_client_unknown_slug_is_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = DefiLlamaClient::new(&server.uri(), TIMEOUT).unwrap();
    let reading = client.fetch_current_tvl("no-such-protocol").await;

    assert_eq!(reading.degraded, Some(DegradationReason::HttpStatus(404)));
}

#[tokio::test]
async fn test_liquidity_client_timeout_is_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/protocol/aave"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(protocol_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = DefiLlamaClient::new(&server.uri(), Duration::from_millis(200)).unwrap();
    let reading = client.fetch_current_tvl("aave").await;

    assert_eq!(reading.tvl_usd, 0.0);
    assert_eq!(reading.degraded, Some(DegradationReason::Timeout));
}

#[tokio::test]
async fn test_liquidity_client_malformed_body_is_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/protocol/aave"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = DefiLlamaClient::new(&server.uri(), TIMEOUT).unwrap();
    let reading = client.fetch_current_tvl("aave").await;

    assert_eq!(reading.degraded, Some(DegradationReason::MalformedData));
}

#[tokio::test]
async fn test_liquidity_client_history_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/protocol/aave"))
        .respond_with(ResponseTemplate::new(200).set_body_json(protocol_body()))
        .mount(&server)
        .await;

    let client = DefiLlamaClient::new(&server.uri(), TIMEOUT).unwrap();

    let full = client.fetch_history("aave", None).await;
    assert!(full.degraded.is_none());
    assert_eq!(full.points.len(), 3);

    let last_day = client.fetch_history("aave", Some(chrono::Duration::days(1))).await;
    assert_eq!(last_day.points.len(), 2);
    assert_eq!(last_day.points[1].tvl_usd, 5_234_567_890.0);
}

#[tokio::test]
async fn test_market_client_sends_query_and_parses_changes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/aave"))
        .and(query_param("market_data", "true"))
        .and(query_param("tickers", "false"))
        .and(query_param("sparkline", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coin_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new(&server.uri(), TIMEOUT, None).unwrap();
    let reading = client.fetch_volatility("aave").await;

    assert!(!reading.is_degraded());
    assert_eq!(reading.change_24h_pct, -2.1);
    assert_eq!(reading.change_7d_pct, 7.0);
    assert!((reading.composite_volatility - (0.7 * 2.1 + 0.3)).abs() < 1e-9);
    assert_eq!(reading.price_usd, 95.5);
    assert_eq!(reading.market_cap_usd, 1_400_000_000.0);
}

#[tokio::test]
async fn test_market_client_sends_api_key_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/aave"))
        .and(header("x-cg-demo-api-key", "demo-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coin_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new(&server.uri(), TIMEOUT, Some("demo-key".to_string())).unwrap();
    assert!(!client.fetch_volatility("aave").await.is_degraded());
}

#[tokio::test]
async fn test_market_client_rate_limited_is_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new(&server.uri(), TIMEOUT, None).unwrap();
    let reading = client.fetch_volatility("aave").await;

    assert_eq!(reading.degraded, Some(DegradationReason::HttpStatus(429)));
    assert_eq!(reading.composite_volatility, 0.0);
}

#[tokio::test]
async fn test_market_client_timeout_is_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(coin_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new(&server.uri(), Duration::from_millis(200), None).unwrap();
    let reading = client.fetch_volatility("aave").await;

    assert_eq!(reading.degraded, Some(DegradationReason::Timeout));
}

#[tokio::test]
async fn test_market_client_missing_market_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/aave"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "aave"})))
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new(&server.uri(), TIMEOUT, None).unwrap();
    let reading = client.fetch_volatility("aave").await;

    assert_eq!(
        reading.degraded,
        Some(DegradationReason::MissingField("market_data".to_string()))
    );
}
