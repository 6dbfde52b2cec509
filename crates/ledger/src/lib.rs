//! Typed access to an ERC20 contract.
//!
//! A [`RemoteLedger`] is bound to one contract address and one credential
//! context. It keeps no state of its own: every call goes to the chain, and
//! failures are returned to the caller without retrying.

pub mod erc20;

use alloy_primitives::{Address, TxHash, U256};
use client::Signing;
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future, str::FromStr, sync::Arc};
use thiserror::Error;

pub use erc20::{Erc20Ledger, TransferSubscription};

/// Address of the inspected token contract.
///
/// Compared as 20 raw bytes, so two spellings differing only in hex case are
/// the same contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAddress(Address);

impl ContractAddress {
    pub const fn get(&self) -> Address {
        self.0
    }
}

impl From<Address> for ContractAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl FromStr for ContractAddress {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_address(s).map(Self)
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid address `{0}`")]
pub struct InvalidAddress(pub String);

/// Parse a hex address in any letter case, with or without `0x`.
pub fn parse_address(s: &str) -> Result<Address, InvalidAddress> {
    let s = s.trim();
    Address::from_str(s).map_err(|_| InvalidAddress(s.to_string()))
}

/// Token metadata, fetched once per address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub address: ContractAddress,
    pub name: String,
    pub symbol: String,
    #[serde(with = "decimal")]
    pub total_supply: U256,
}

/// Balance of one account as of the last explicit query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub owner_address: Address,
    #[serde(with = "decimal")]
    pub balance: U256,
}

/// A `Transfer` event observed on the inspected contract.
///
/// `tx_hash` is the identity of the entry within a transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEvent {
    pub tx_hash: TxHash,
    pub from: Address,
    pub to: Address,
    #[serde(with = "decimal")]
    pub amount: U256,
}

/// Inclusion details of a submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// A read or write against the ledger failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The call could not be executed or decoded
    #[error("{call} on {address} failed: {message}")]
    Call {
        call: &'static str,
        address: ContractAddress,
        message: String,
    },

    /// The transaction was included but execution reverted
    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    /// Installing or removing the event filter failed
    #[error("transfer subscription on {address}: {message}")]
    Subscription {
        address: ContractAddress,
        message: String,
    },
}

impl LedgerError {
    pub fn call(call: &'static str, address: ContractAddress, err: impl fmt::Display) -> Self {
        Self::Call {
            call,
            address,
            message: err.to_string(),
        }
    }

    pub fn subscription(address: ContractAddress, err: impl fmt::Display) -> Self {
        Self::Subscription {
            address,
            message: err.to_string(),
        }
    }
}

/// Push callback invoked once per delivered transfer event.
pub type TransferSink = Arc<dyn Fn(TransferEvent) + Send + Sync>;

/// Live delivery of transfer events, released through [`Subscription::cancel`].
pub trait Subscription: Send + Sync + 'static {
    /// Stop delivery. After this returns no further events reach the sink.
    fn cancel(self) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// Remote calls against one token contract.
pub trait RemoteLedger: Send + Sync + 'static {
    /// Credential context the client talks through.
    type Context: Clone + Send + Sync + 'static;

    type Subscription: Subscription;

    /// Bind a client to `address` over a read-only context.
    fn connect(context: Self::Context, address: ContractAddress) -> Self
    where
        Self: Sized;

    /// Read name, symbol and total supply.
    fn read_metadata(&self) -> impl Future<Output = Result<TokenMetadata, LedgerError>> + Send;

    fn read_balance(
        &self,
        owner: Address,
    ) -> impl Future<Output = Result<U256, LedgerError>> + Send;

    /// Submit `transfer(recipient, amount)` and wait until it is included.
    fn submit_transfer(
        &self,
        recipient: Address,
        amount: U256,
        signing: &Signing<Self::Context>,
    ) -> impl Future<Output = Result<TransferReceipt, LedgerError>> + Send;

    /// Start delivering transfer events emitted from now on to `sink`.
    fn open_transfer_subscription(
        &self,
        sink: TransferSink,
    ) -> impl Future<Output = Result<Self::Subscription, LedgerError>> + Send;
}

/// Serde adapter writing token amounts as base-10 strings.
pub mod decimal {
    use alloy_primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    #[test]
    fn test_contract_address_ignores_case() {
        let lower: ContractAddress = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".parse().unwrap();
        let upper: ContractAddress = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_contract_address_rejects_garbage() {
        let err = "0xnot-an-address".parse::<ContractAddress>().unwrap_err();
        assert_eq!(err, InvalidAddress("0xnot-an-address".to_string()));
    }

    #[test]
    fn test_total_supply_keeps_precision() {
        let metadata = TokenMetadata {
            address: address!("00000000000000000000000000000000000000aa").into(),
            name: "Tok".to_string(),
            symbol: "TOK".to_string(),
            total_supply: U256::from_str_radix("1000000000000000000000000", 10).unwrap(),
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["totalSupply"], "1000000000000000000000000");

        let back: TokenMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn test_transfer_event_json_shape() {
        let event = TransferEvent {
            tx_hash: b256!("0000000000000000000000000000000000000000000000000000000000000001"),
            from: address!("000000000000000000000000000000000000000b"),
            to: address!("000000000000000000000000000000000000000c"),
            amount: U256::from(5),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["amount"], "5");
        assert!(json.get("txHash").is_some());
    }
}
