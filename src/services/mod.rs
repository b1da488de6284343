pub mod liquidity_client;
pub mod market_data_client;
pub mod protocol_registry;
pub mod provider_http;
pub mod risk_explainability_service;
pub mod risk_gauge_service;
pub mod risk_normalizer;
pub mod risk_scorer;
pub mod traits;

pub use liquidity_client::*;
pub use market_data_client::*;
pub use protocol_registry::*;
pub use risk_explainability_service::*;
pub use risk_gauge_service::*;
pub use risk_normalizer::*;
pub use risk_scorer::*;
pub use traits::*;
