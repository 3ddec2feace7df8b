//! Porter Configuration
//!
//! Read from the process environment after an optional `.env` file:
//!
//! - `MET_RPC_URL` - JSON-RPC endpoint of the chain
//! - `MET_AUCTIONS_ADDRESS`, `MET_CONVERTER_ADDRESS`, `MET_TOKEN_ADDRESS`,
//!   `MET_TOKEN_PORTER_ADDRESS` - contract addresses
//! - `MET_FALLBACK_GAS` - gas for steps that cannot be estimated (optional)
//! - `MET_MERKLE_ODD_NODES` - `duplicate` or `promote` (optional)

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::debug;

use crate::gas::{GasConfig, DEFAULT_FALLBACK_GAS};
use crate::merkle::OddNodePolicy;
use crate::types::ContractAddresses;

/// Connection and tuning for one MET chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PorterConfig {
    pub rpc_url: String,
    pub contracts: ContractAddresses,
    #[serde(default)]
    pub gas: GasConfig,
    /// How proofs treat the last node of an odd-sized level
    #[serde(default)]
    pub odd_nodes: OddNodePolicy,
}

fn default_fallback_gas() -> u64 {
    DEFAULT_FALLBACK_GAS
}

fn default_odd_nodes() -> OddNodePolicy {
    OddNodePolicy::Duplicate
}

impl PorterConfig {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
            debug!(path = %path, "Loaded environment file");
        }
        Self::load_from_env()
    }

    /// Load configuration from the process environment
    pub fn load_from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| eyre!("{} environment variable is required", key))
        };
        let address = |key: &str| -> Result<Address> {
            required(key)?
                .trim()
                .parse()
                .wrap_err_with(|| format!("{} must be a valid hex address", key))
        };

        let contracts = ContractAddresses {
            auctions: address("MET_AUCTIONS_ADDRESS")?,
            autonomous_converter: address("MET_CONVERTER_ADDRESS")?,
            met_token: address("MET_TOKEN_ADDRESS")?,
            token_porter: address("MET_TOKEN_PORTER_ADDRESS")?,
        };

        let fallback_gas = match lookup("MET_FALLBACK_GAS") {
            Some(raw) => raw
                .trim()
                .parse()
                .wrap_err("MET_FALLBACK_GAS must be a valid u64")?,
            None => default_fallback_gas(),
        };

        let odd_nodes = match lookup("MET_MERKLE_ODD_NODES") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: String| eyre!("MET_MERKLE_ODD_NODES: {}", e))?,
            None => default_odd_nodes(),
        };

        let config = PorterConfig {
            rpc_url: required("MET_RPC_URL")?.trim().to_string(),
            contracts,
            gas: GasConfig { fallback_gas },
            odd_nodes,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(eyre!("rpc_url cannot be empty"));
        }

        if self.gas.fallback_gas == 0 {
            return Err(eyre!("gas.fallback_gas must be greater than zero"));
        }

        let c = &self.contracts;
        for (name, addr) in [
            ("auctions", c.auctions),
            ("autonomous_converter", c.autonomous_converter),
            ("met_token", c.met_token),
            ("token_porter", c.token_porter),
        ] {
            if addr == Address::ZERO {
                return Err(eyre!("contracts.{} cannot be the zero address", name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("MET_RPC_URL", "http://localhost:8545".to_string()),
            (
                "MET_AUCTIONS_ADDRESS",
                "0x1111111111111111111111111111111111111111".to_string(),
            ),
            (
                "MET_CONVERTER_ADDRESS",
                "0x2222222222222222222222222222222222222222".to_string(),
            ),
            (
                "MET_TOKEN_ADDRESS",
                "0x3333333333333333333333333333333333333333".to_string(),
            ),
            (
                "MET_TOKEN_PORTER_ADDRESS",
                "0x4444444444444444444444444444444444444444".to_string(),
            ),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<PorterConfig> {
        PorterConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.gas.fallback_gas, 250_000);
        assert_eq!(config.odd_nodes, OddNodePolicy::Duplicate);
        assert_eq!(config.contracts.met_token, Address::repeat_byte(0x33));
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("MET_FALLBACK_GAS", "400000".to_string());
        env.insert("MET_MERKLE_ODD_NODES", "promote".to_string());

        let config = load(&env).unwrap();
        assert_eq!(config.gas.fallback_gas, 400_000);
        assert_eq!(config.odd_nodes, OddNodePolicy::Promote);
    }

    #[test]
    fn test_missing_required_variable() {
        let mut env = base_env();
        env.remove("MET_TOKEN_PORTER_ADDRESS");

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("MET_TOKEN_PORTER_ADDRESS"));
    }

    #[test]
    fn test_invalid_address() {
        let mut env = base_env();
        env.insert("MET_TOKEN_ADDRESS", "0x1234".to_string());

        assert!(load(&env).is_err());
    }

    #[test]
    fn test_zero_fallback_gas_rejected() {
        let mut env = base_env();
        env.insert("MET_FALLBACK_GAS", "0".to_string());

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("fallback_gas"));
    }

    #[test]
    fn test_unparseable_fallback_gas_rejected() {
        let mut env = base_env();
        env.insert("MET_FALLBACK_GAS", "lots".to_string());

        assert!(load(&env).is_err());
    }

    #[test]
    fn test_unknown_odd_node_policy_rejected() {
        let mut env = base_env();
        env.insert("MET_MERKLE_ODD_NODES", "sorted".to_string());

        assert!(load(&env).is_err());
    }

    #[test]
    fn test_empty_rpc_url_rejected() {
        let mut env = base_env();
        env.insert("MET_RPC_URL", "  ".to_string());

        assert!(load(&env).is_err());
    }

    #[test]
    fn test_zero_address_rejected() {
        let mut env = base_env();
        env.insert(
            "MET_AUCTIONS_ADDRESS",
            "0x0000000000000000000000000000000000000000".to_string(),
        );

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("auctions"));
    }
}
