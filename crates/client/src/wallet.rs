//! The wallet collaborator.
//!
//! A [`Wallet`] hands out credential contexts: a read-only context that needs
//! no user interaction, and a signing context that requires the account to be
//! unlocked. It also owns the choice of network.

use crate::{create_provider, create_wallet_provider, ClientError};
use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider};
use alloy_signer_local::PrivateKeySigner;
use config::{NetworkConfig, NetworkRegistry};
use std::{
    fmt,
    future::Future,
    sync::{PoisonError, RwLock},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info};

/// The wallet declined to provide a signing context.
#[derive(Error, Debug)]
pub enum AuthorizationError {
    /// No signing key is available
    #[error("no wallet account available")]
    NoWallet,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// A chain switch was rejected or is unsupported.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("chain {0:#x} is not a configured network")]
    Unsupported(u64),

    #[error("endpoint reports chain {actual:#x}, expected {expected:#x}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("network endpoint unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// An authenticated capability attributable to `account`.
#[derive(Clone)]
pub struct Signing<C> {
    pub account: Address,
    pub context: C,
}

impl<C> fmt::Debug for Signing<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signing")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Provider plus the cadence at which event filters are polled through it.
#[derive(Clone)]
pub struct RpcContext {
    pub provider: DynProvider,
    pub poll_interval: Duration,
}

/// Wallet/network collaborator consumed by the session controller.
pub trait Wallet: Send + Sync + 'static {
    /// Credential context handed to ledger clients.
    type Context: Clone + Send + Sync + 'static;

    /// Read-only context, no user interaction required.
    fn read_only(&self) -> Self::Context;

    /// Currently selected network.
    fn network(&self) -> NetworkConfig;

    /// Ask for a signing context on the current network.
    fn request_account_access(
        &self,
    ) -> impl Future<Output = Result<Signing<Self::Context>, AuthorizationError>> + Send;

    /// Switch to the network identified by `chain_id`.
    fn request_network_switch(
        &self,
        chain_id: u64,
    ) -> impl Future<Output = Result<NetworkConfig, NetworkError>> + Send;
}

struct ActiveNetwork {
    network: NetworkConfig,
    provider: DynProvider,
}

/// Wallet backed by JSON-RPC endpoints and an optional local key.
pub struct InjectedWallet {
    registry: NetworkRegistry,
    signer: Option<PrivateKeySigner>,
    poll_interval: Duration,
    active: RwLock<ActiveNetwork>,
}

impl InjectedWallet {
    pub fn new(
        registry: NetworkRegistry,
        network: NetworkConfig,
        signer: Option<PrivateKeySigner>,
        poll_interval: Duration,
    ) -> Result<Self, ClientError> {
        let provider = create_provider(&network.rpc_url)?;
        Ok(Self {
            registry,
            signer,
            poll_interval,
            active: RwLock::new(ActiveNetwork { network, provider }),
        })
    }
}

impl Wallet for InjectedWallet {
    type Context = RpcContext;

    fn read_only(&self) -> RpcContext {
        let provider = self
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .provider
            .clone();
        RpcContext {
            provider,
            poll_interval: self.poll_interval,
        }
    }

    fn network(&self) -> NetworkConfig {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .network
            .clone()
    }

    async fn request_account_access(&self) -> Result<Signing<RpcContext>, AuthorizationError> {
        let signer = self.signer.clone().ok_or(AuthorizationError::NoWallet)?;
        let rpc_url = self.network().rpc_url;

        let (account, provider) = create_wallet_provider(&rpc_url, signer)?;
        debug!(account = %account, "Account access granted");

        Ok(Signing {
            account,
            context: RpcContext {
                provider,
                poll_interval: self.poll_interval,
            },
        })
    }

    async fn request_network_switch(&self, chain_id: u64) -> Result<NetworkConfig, NetworkError> {
        let network = self
            .registry
            .by_chain_id(chain_id)
            .cloned()
            .ok_or(NetworkError::Unsupported(chain_id))?;

        let provider = create_provider(&network.rpc_url)?;
        let actual = provider
            .get_chain_id()
            .await
            .map_err(|e| NetworkError::Unavailable(e.to_string()))?;

        if actual != chain_id {
            return Err(NetworkError::ChainMismatch {
                expected: chain_id,
                actual,
            });
        }

        info!(chain_id, network = %network.network_type, "Switched network");

        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active = ActiveNetwork {
            network: network.clone(),
            provider,
        };

        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::NetworkType;

    fn wallet(signer: Option<PrivateKeySigner>) -> InjectedWallet {
        InjectedWallet::new(
            NetworkRegistry::default(),
            NetworkConfig::local(),
            signer,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_account_access_without_key() {
        let result = wallet(None).request_account_access().await;
        assert!(matches!(result, Err(AuthorizationError::NoWallet)));
    }

    #[tokio::test]
    async fn test_account_access_with_key() {
        let signer = crate::parse_signer(
            "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        )
        .unwrap();
        let expected = signer.address();

        let signing = wallet(Some(signer)).request_account_access().await.unwrap();
        assert_eq!(signing.account, expected);
    }

    #[tokio::test]
    async fn test_switch_to_unknown_chain() {
        let wallet = wallet(None);
        let result = wallet.request_network_switch(42).await;

        assert!(matches!(result, Err(NetworkError::Unsupported(42))));
        assert_eq!(wallet.network().network_type, NetworkType::Local);
    }
}
