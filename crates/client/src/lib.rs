mod wallet;

use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use thiserror::Error;
pub use wallet::{AuthorizationError, InjectedWallet, NetworkError, RpcContext, Signing, Wallet};

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    /// Error with private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Convenience function to create a read-only ethereum rpc provider from url.
pub fn create_provider(rpc_url: &str) -> Result<DynProvider, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;
    let provider = ProviderBuilder::new().connect_http(url);

    Ok(provider.erased())
}

/// Parse a hex private key, with or without `0x` prefix.
pub fn parse_signer(private_key: &str) -> Result<PrivateKeySigner, ClientError> {
    private_key
        .trim()
        .parse()
        .map_err(|e| ClientError::InvalidPrivateKey(format!("{}", e)))
}

/// Create a provider with wallet signing capability.
///
/// Returns the signing account alongside the provider.
pub fn create_wallet_provider(
    rpc_url: &str,
    signer: PrivateKeySigner,
) -> Result<(Address, DynProvider), ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;

    let account = signer.address();
    let wallet = EthereumWallet::from(signer);

    let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

    Ok((account, provider.erased()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // anvil's first dev account
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_invalid_url() {
        let result = create_provider("not a url");
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(matches!(
            parse_signer("0xdeadbeef"),
            Err(ClientError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_wallet_provider_account() {
        let signer = parse_signer(DEV_KEY).unwrap();
        let expected = signer.address();
        let (account, _provider) =
            create_wallet_provider("http://127.0.0.1:8545", signer).unwrap();
        assert_eq!(account, expected);
        assert_eq!(
            account,
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }
}
