use config::{NetworkConfig, NetworkConfigBuilder, NetworkRegistry, NetworkType};
use ledger::ContractAddress;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

const fn default_poll_interval_ms() -> u64 {
    4_000
}

/// Top-level explorer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network the wallet starts on
    pub network: NetworkType,

    /// RPC endpoint override for the starting network
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// How often the transfer filter is polled, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Port for the Prometheus exporter, disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,

    /// Contract to inspect on startup
    #[serde(default)]
    pub contract_address: Option<ContractAddress>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkType::Sepolia,
            rpc_url: None,
            poll_interval_ms: default_poll_interval_ms(),
            metrics_port: None,
            contract_address: None,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Configuration of the starting network, with overrides applied.
    pub fn network_config(&self) -> NetworkConfig {
        let builder = NetworkConfigBuilder::new(self.network);
        match &self.rpc_url {
            Some(rpc_url) => builder.rpc_url(rpc_url.clone()).build(),
            None => builder.build(),
        }
    }

    /// Networks the wallet may switch to. The starting network carries the
    /// overridden endpoint.
    pub fn registry(&self) -> NetworkRegistry {
        let mut registry = NetworkRegistry::default();
        registry.upsert(self.network_config());
        registry
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: Config = toml::from_str(r#"network = "sepolia""#).unwrap();

        assert_eq!(config.network, NetworkType::Sepolia);
        assert_eq!(config.poll_interval(), Duration::from_secs(4));
        assert!(config.metrics_port.is_none());
        assert!(config.contract_address.is_none());
    }

    #[test]
    fn test_full_config() {
        let config: Config = toml::from_str(
            r#"
            network = "local"
            rpc_url = "http://10.0.0.2:8545"
            poll_interval_ms = 500
            metrics_port = 9100
            contract_address = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
            "#,
        )
        .unwrap();

        assert_eq!(config.network_config().rpc_url, "http://10.0.0.2:8545");
        assert_eq!(
            config
                .registry()
                .by_type(NetworkType::Local)
                .map(|n| n.rpc_url.as_str()),
            Some("http://10.0.0.2:8545")
        );
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.metrics_port, Some(9100));
        assert!(config.contract_address.is_some());
    }

    #[test]
    fn test_unknown_network_rejected() {
        assert!(toml::from_str::<Config>(r#"network = "goerli""#).is_err());
    }
}
