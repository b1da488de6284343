use std::net::SocketAddr;
use std::sync::Arc;

use defi_risk_gauge::{
    config::Settings,
    handlers::{create_router, AppState},
    services::RiskGaugeService,
    utils::{logging::init_logging, metrics::GaugeMetrics},
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env is normal outside development.
        eprintln!("No .env loaded: {}", e);
    }

    let settings = Settings::new()?;
    init_logging(&settings.logging)?;
    info!("Starting DeFi Risk Gauge v{}", env!("CARGO_PKG_VERSION"));

    let metrics = GaugeMetrics::new()?;
    let service = RiskGaugeService::from_settings(&settings, metrics.clone())?;
    info!(
        protocols = service.registry().len(),
        cache_ttl_seconds = settings.cache.ttl_seconds,
        "Configuration loaded"
    );

    let app = create_router(AppState {
        service: Arc::new(service),
        metrics,
    });

    let addr: SocketAddr = format!("{}:{}", settings.api.host, settings.api.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Listening on {}", addr);
    info!("  GET /health");
    info!("  GET /metrics");
    info!("  GET /api/v1/protocols");
    info!("  GET /api/v1/protocols/{{id}}/risk");
    info!("  GET /api/v1/protocols/{{id}}/tvl-history?days=N");
    info!("  GET /api/v1/protocols/{{id}}/scenarios");
    info!("  GET /api/v1/protocols/{{id}}/explanation");
    info!("  GET /api/v1/compare?ids=a,b,c");

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("DeFi Risk Gauge stopped");
    Ok(())
}
