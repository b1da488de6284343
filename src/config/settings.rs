use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::AppError;

const ENV_PREFIX: &str = "RISK_GAUGE";
const CONFIG_PATH_VAR: &str = "RISK_GAUGE_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub liquidity_provider: LiquidityProviderSettings,
    pub market_provider: MarketProviderSettings,
    pub cache: CacheSettings,
    pub comparison: ComparisonSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityProviderSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketProviderSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_seconds: u64,
    pub max_capacity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    pub inter_protocol_delay_ms: u64,
    pub max_protocols: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// One of `compact`, `pretty` or `json`.
    pub format: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LiquidityProviderSettings {
    fn default() -> Self {
        LiquidityProviderSettings {
            base_url: "https://api.llama.fi".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for MarketProviderSettings {
    fn default() -> Self {
        MarketProviderSettings {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            timeout_seconds: 10,
            api_key: None,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            ttl_seconds: 300,
            max_capacity: 1000,
        }
    }
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        ComparisonSettings {
            inter_protocol_delay_ms: 250,
            max_protocols: 8,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl ComparisonSettings {
    pub fn inter_protocol_delay(&self) -> Duration {
        Duration::from_millis(self.inter_protocol_delay_ms)
    }
}

impl Settings {
    /// Load settings from `config/default.*`, the file named by
    /// `RISK_GAUGE_CONFIG`, then `RISK_GAUGE__SECTION__KEY` environment
    /// variables. Later sources win.
    pub fn new() -> Result<Self, AppError> {
        let explicit = std::env::var(CONFIG_PATH_VAR).ok();
        Self::load(explicit.as_deref().map(Path::new))
    }

    pub fn load(config_file: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_base_url("liquidity_provider.base_url", &self.liquidity_provider.base_url)?;
        validate_base_url("market_provider.base_url", &self.market_provider.base_url)?;

        if self.liquidity_provider.timeout_seconds == 0 || self.market_provider.timeout_seconds == 0 {
            return Err(AppError::ConfigError("provider timeouts must be at least 1 second".to_string()));
        }
        if self.cache.ttl_seconds == 0 {
            return Err(AppError::ConfigError("cache.ttl_seconds must be positive".to_string()));
        }
        if self.cache.max_capacity == 0 {
            return Err(AppError::ConfigError("cache.max_capacity must be positive".to_string()));
        }
        if self.comparison.max_protocols == 0 {
            return Err(AppError::ConfigError("comparison.max_protocols must be positive".to_string()));
        }

        Ok(())
    }
}

fn validate_base_url(name: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ConfigError(format!("{} must not be empty", name)));
    }
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| AppError::ConfigError(format!("{} is not a valid URL: {}", name, e)))
}
