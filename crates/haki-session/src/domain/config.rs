//! Session configuration: target network and contract addresses.

use std::env;

use haki_types::{parse_address, Address, ChainId, NetworkParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deployed addresses of the three contract collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub registry: Address,
    pub escrow: Address,
    pub token: Address,
}

/// Configuration for the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The single network the session must run on.
    pub network: NetworkParams,
    pub contracts: ContractAddresses,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            network: NetworkParams::sepolia(),
            contracts: ContractAddresses::default(),
        }
    }
}

impl SessionConfig {
    /// Target chain id.
    pub fn target_chain(&self) -> ChainId {
        self.network.chain_id
    }

    /// Load from the environment.
    ///
    /// - `HAKI_REGISTRY_ADDRESS`, `HAKI_ESCROW_ADDRESS`, `HAKI_TOKEN_ADDRESS`: required
    /// - `HAKI_TARGET_CHAIN_ID`: hex or decimal (default: Sepolia)
    /// - `HAKI_RPC_URL`: overrides the RPC url offered when adding the network
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            contracts: ContractAddresses {
                registry: address_var("HAKI_REGISTRY_ADDRESS")?,
                escrow: address_var("HAKI_ESCROW_ADDRESS")?,
                token: address_var("HAKI_TOKEN_ADDRESS")?,
            },
            ..Self::default()
        };

        if let Ok(raw) = env::var("HAKI_TARGET_CHAIN_ID") {
            let chain = raw.parse::<ChainId>().map_err(|_| ConfigError::Invalid {
                var: "HAKI_TARGET_CHAIN_ID",
                value: raw.clone(),
            })?;
            if chain != config.network.chain_id {
                config.network.chain_id = chain;
                config.network.chain_name = format!("Chain {}", chain);
            }
        }

        if let Ok(url) = env::var("HAKI_RPC_URL") {
            config.network.rpc_urls = vec![url];
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let addresses = [
            ("registry", self.contracts.registry),
            ("escrow", self.contracts.escrow),
            ("token", self.contracts.token),
        ];
        for (name, address) in addresses {
            if address.is_zero() {
                return Err(ConfigError::ZeroAddress(name));
            }
        }

        if self.network.rpc_urls.is_empty() {
            return Err(ConfigError::Invalid {
                var: "rpc_urls",
                value: String::new(),
            });
        }

        Ok(())
    }
}

fn address_var(var: &'static str) -> Result<Address, ConfigError> {
    let raw = env::var(var).map_err(|_| ConfigError::Missing(var))?;
    parse_address(&raw).ok_or(ConfigError::Invalid { var, value: raw })
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("{0} contract address is zero")]
    ZeroAddress(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> SessionConfig {
        SessionConfig {
            contracts: ContractAddresses {
                registry: Address::repeat_byte(1),
                escrow: Address::repeat_byte(2),
                token: Address::repeat_byte(3),
            },
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_default_targets_sepolia() {
        assert_eq!(SessionConfig::default().target_chain(), ChainId::SEPOLIA);
    }

    #[test]
    fn test_default_addresses_fail_validation() {
        assert_eq!(
            SessionConfig::default().validate(),
            Err(ConfigError::ZeroAddress("registry"))
        );
    }

    #[test]
    fn test_configured_addresses_validate() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_empty_rpc_urls_rejected() {
        let mut config = configured();
        config.network.rpc_urls.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var: "rpc_urls", .. })
        ));
    }
}
