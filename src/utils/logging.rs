use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSettings;
use crate::error::AppError;

/// Install the global subscriber. `RUST_LOG` wins over `settings.level`.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), AppError> {
    let log_level = settings
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("defi_risk_gauge={},tower_http=info", log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = match settings.format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        "pretty" => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer().compact()).try_init(),
    };
    result.map_err(|e| AppError::InternalError(format!("logging already initialized: {}", e)))?;

    info!(level = %settings.level, format = %settings.format, "Logging initialized");
    Ok(())
}
