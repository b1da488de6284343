use std::collections::HashMap;
use tracing::debug;

use crate::error::AppError;
use crate::models::ProtocolConfig;

/// Immutable lookup table of scored protocols, built once at startup.
#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    protocols: Vec<ProtocolConfig>,
    index: HashMap<String, usize>,
}

impl ProtocolRegistry {
    /// Build a registry, rejecting out-of-range audit scores and duplicate
    /// identifiers or display names.
    pub fn new(protocols: Vec<ProtocolConfig>) -> Result<Self, AppError> {
        let mut index = HashMap::new();

        for (position, protocol) in protocols.iter().enumerate() {
            if protocol.id.trim().is_empty() {
                return Err(AppError::ConfigError("protocol identifier must not be empty".to_string()));
            }
            if !(0.0..=1.0).contains(&protocol.audit_score) {
                return Err(AppError::ConfigError(format!(
                    "audit score for {} must be within [0, 1], got {}",
                    protocol.id, protocol.audit_score
                )));
            }

            for key in [normalize_key(&protocol.id), normalize_key(&protocol.display_name)] {
                match index.get(&key) {
                    Some(existing) if *existing != position => {
                        return Err(AppError::ConfigError(format!(
                            "protocol key '{}' registered twice",
                            key
                        )));
                    }
                    _ => {
                        index.insert(key, position);
                    }
                }
            }
        }

        Ok(Self { protocols, index })
    }

    /// Resolve by identifier or display name, ignoring case and surrounding
    /// whitespace.
    pub fn resolve(&self, protocol_id: &str) -> Result<&ProtocolConfig, AppError> {
        let key = normalize_key(protocol_id);
        match self.index.get(&key) {
            Some(position) => Ok(&self.protocols[*position]),
            None => {
                debug!(protocol_id = %protocol_id, "Protocol not found in registry");
                Err(AppError::NotFound(protocol_id.trim().to_string()))
            }
        }
    }

    pub fn protocols(&self) -> &[ProtocolConfig] {
        &self.protocols
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new(default_protocols()).expect("built-in protocol table is valid")
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// The protocols scored out of the box.
pub fn default_protocols() -> Vec<ProtocolConfig> {
    vec![
        ProtocolConfig::new("aave", "Aave", "aave", "aave", 0.85, "Decentralized lending and borrowing protocol"),
        ProtocolConfig::new("uniswap", "Uniswap", "uniswap", "uniswap", 0.80, "Largest decentralized exchange (DEX)"),
        ProtocolConfig::new("curve", "Curve", "curve", "curve-dao-token", 0.82, "Stablecoin and pegged asset exchange"),
        ProtocolConfig::new("lido", "Lido", "lido", "lido-dao", 0.80, "Liquid staking protocol for Ethereum"),
        ProtocolConfig::new("compound", "Compound", "compound", "compound-governance-token", 0.83, "Algorithmic money market protocol"),
        ProtocolConfig::new("makerdao", "MakerDAO", "makerdao", "maker", 0.85, "Decentralized stablecoin (DAI) protocol"),
        ProtocolConfig::new("yearn-finance", "Yearn Finance", "yearn-finance", "yearn-finance", 0.75, "Yield aggregator and vault optimizer"),
        ProtocolConfig::new("balancer", "Balancer", "balancer", "balancer", 0.78, "Automated market maker with customizable pools"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_resolves_by_id_and_name() {
        let registry = ProtocolRegistry::default();
        assert_eq!(registry.len(), 8);

        let aave = registry.resolve("aave").unwrap();
        assert_eq!(aave.market_id, "aave");
        assert_eq!(aave.audit_score, 0.85);

        let yearn = registry.resolve("  Yearn Finance ").unwrap();
        assert_eq!(yearn.liquidity_slug, "yearn-finance");

        assert_eq!(registry.resolve("CURVE").unwrap().market_id, "curve-dao-token");
    }

    #[test]
    fn test_unknown_protocol_is_not_found() {
        let registry = ProtocolRegistry::default();
        let err = registry.resolve("sushiswap").unwrap_err();
        assert_eq!(err, AppError::NotFound("sushiswap".to_string()));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_rejects_audit_score_out_of_range() {
        let result = ProtocolRegistry::new(vec![ProtocolConfig::new("x", "X", "x", "x", 1.2, "")]);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_duplicate_identifiers() {
        let result = ProtocolRegistry::new(vec![
            ProtocolConfig::new("aave", "Aave", "aave", "aave", 0.85, ""),
            ProtocolConfig::new("AAVE", "Aave v3", "aave-v3", "aave", 0.85, ""),
        ]);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
