//! Network configuration for the token explorer.
//!
//! Provides chain-specific parameters for the networks the wallet can
//! switch between (mainnet, Sepolia, a local development node).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sepolia chain id (`0xAA36A7`), the default switch target.
pub const SEPOLIA_CHAIN_ID: u64 = 0xAA36A7;

/// Well-known network presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Sepolia,
    Local,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown network `{0}`, expected one of: mainnet, sepolia, local")]
pub struct UnknownNetwork(pub String);

impl FromStr for NetworkType {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "sepolia" => Ok(Self::Sepolia),
            "local" => Ok(Self::Local),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mainnet => "mainnet",
            Self::Sepolia => "sepolia",
            Self::Local => "local",
        };
        f.write_str(name)
    }
}

/// Parameters of a single network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network preset this configuration was derived from
    pub network_type: NetworkType,
    /// Chain ID
    pub chain_id: u64,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Block explorer base url, without trailing slash
    pub explorer_url: Option<String>,
}

impl NetworkConfig {
    /// Ethereum mainnet configuration.
    pub fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            chain_id: 1,
            rpc_url: "https://ethereum-rpc.publicnode.com".to_string(),
            explorer_url: Some("https://etherscan.io".to_string()),
        }
    }

    /// Ethereum Sepolia testnet configuration.
    pub fn sepolia() -> Self {
        Self {
            network_type: NetworkType::Sepolia,
            chain_id: SEPOLIA_CHAIN_ID,
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            explorer_url: Some("https://sepolia.etherscan.io".to_string()),
        }
    }

    /// Local development node (anvil / hardhat defaults).
    pub fn local() -> Self {
        Self {
            network_type: NetworkType::Local,
            chain_id: 31337,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            explorer_url: None,
        }
    }

    /// Create configuration from network type.
    pub fn from_network_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Sepolia => Self::sepolia(),
            NetworkType::Local => Self::local(),
        }
    }

    /// Link to a transaction on the block explorer, if the network has one.
    pub fn tx_url(&self, tx_hash: impl fmt::Display) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{base}/tx/{tx_hash}"))
    }
}

/// Builder for custom network configurations.
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
    config: NetworkConfig,
}

impl NetworkConfigBuilder {
    /// Start from a preset.
    pub fn new(network_type: NetworkType) -> Self {
        Self {
            config: NetworkConfig::from_network_type(network_type),
        }
    }

    /// Override the RPC endpoint.
    pub fn rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.config.rpc_url = rpc_url.into();
        self
    }

    /// Override the chain id, for forks and custom devnets.
    pub const fn chain_id(mut self, chain_id: u64) -> Self {
        self.config.chain_id = chain_id;
        self
    }

    /// Override the block explorer base url.
    pub fn explorer_url(mut self, explorer_url: impl Into<String>) -> Self {
        self.config.explorer_url = Some(explorer_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Build the network configuration.
    pub fn build(self) -> NetworkConfig {
        self.config
    }
}

/// The set of networks the wallet is allowed to switch between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRegistry {
    networks: Vec<NetworkConfig>,
}

impl NetworkRegistry {
    pub const fn new(networks: Vec<NetworkConfig>) -> Self {
        Self { networks }
    }

    /// Look up a network by chain id.
    pub fn by_chain_id(&self, chain_id: u64) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    /// Look up a network by preset.
    pub fn by_type(&self, network_type: NetworkType) -> Option<&NetworkConfig> {
        self.networks
            .iter()
            .find(|n| n.network_type == network_type)
    }

    /// Replace the entry sharing `network`'s preset, or add it.
    pub fn upsert(&mut self, network: NetworkConfig) {
        match self
            .networks
            .iter_mut()
            .find(|n| n.network_type == network.network_type)
        {
            Some(existing) => *existing = network,
            None => self.networks.push(network),
        }
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new(vec![
            NetworkConfig::mainnet(),
            NetworkConfig::sepolia(),
            NetworkConfig::local(),
        ])
    }
}
