//! Parsing of user intents from prompt lines.

use alloy_primitives::{Address, U256};
use config::{NetworkConfig, NetworkType, SEPOLIA_CHAIN_ID};
use ledger::{parse_address, ContractAddress, InvalidAddress};
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  address <contract>             inspect an ERC20 contract
  balance <owner>                read the balance of <owner>
  mybalance                      read the balance of the wallet account
  transfer <recipient> <amount>  send <amount> base units to <recipient>
  connect                        request wallet account access
  switch [chain]                 switch network (chain id or name, default sepolia)
  show                           print the current state
  help                           print this message
  quit                           leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SetAddress(ContractAddress),
    RequestBalance(Address),
    RequestOwnBalance,
    SubmitTransfer { recipient: Address, amount: U256 },
    Connect,
    SwitchNetwork(u64),
    Show,
    Help,
    Quit,
}

impl Intent {
    /// Label used for metrics and logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SetAddress(_) => "set_address",
            Self::RequestBalance(_) => "request_balance",
            Self::RequestOwnBalance => "request_own_balance",
            Self::SubmitTransfer { .. } => "submit_transfer",
            Self::Connect => "connect",
            Self::SwitchNetwork(_) => "switch_network",
            Self::Show => "show",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("unknown command `{0}`, try `help`")]
    UnknownCommand(String),

    #[error("`{command}` expects {expected}")]
    Usage {
        command: &'static str,
        expected: &'static str,
    },

    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),

    #[error("invalid amount `{0}`, expected a base-10 integer")]
    InvalidAmount(String),

    #[error("invalid chain `{0}`, expected a chain id or one of: mainnet, sepolia, local")]
    InvalidChain(String),
}

impl FromStr for Intent {
    type Err = IntentError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("show").to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        match (command.as_str(), args.as_slice()) {
            ("address" | "addr", [contract]) => Ok(Self::SetAddress(contract.parse()?)),
            ("address" | "addr", _) => Err(IntentError::Usage {
                command: "address",
                expected: "a contract address",
            }),
            ("balance", [owner]) => Ok(Self::RequestBalance(parse_address(owner)?)),
            ("balance", _) => Err(IntentError::Usage {
                command: "balance",
                expected: "an owner address",
            }),
            ("mybalance", []) => Ok(Self::RequestOwnBalance),
            ("transfer", [recipient, amount]) => Ok(Self::SubmitTransfer {
                recipient: parse_address(recipient)?,
                amount: parse_amount(amount)?,
            }),
            ("transfer", _) => Err(IntentError::Usage {
                command: "transfer",
                expected: "a recipient address and an amount",
            }),
            ("connect", []) => Ok(Self::Connect),
            ("switch", []) => Ok(Self::SwitchNetwork(SEPOLIA_CHAIN_ID)),
            ("switch", [chain]) => parse_chain(chain).map(Self::SwitchNetwork),
            ("show", []) => Ok(Self::Show),
            ("help" | "?", _) => Ok(Self::Help),
            ("quit" | "exit", []) => Ok(Self::Quit),
            (other, _) => Err(IntentError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_amount(s: &str) -> Result<U256, IntentError> {
    U256::from_str_radix(s, 10).map_err(|_| IntentError::InvalidAmount(s.to_string()))
}

/// Chain id in decimal or `0x` hex, or a preset name.
fn parse_chain(s: &str) -> Result<u64, IntentError> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse::<u64>().ok(),
    };
    parsed
        .or_else(|| {
            s.parse::<NetworkType>()
                .ok()
                .map(|n| NetworkConfig::from_network_type(n).chain_id)
        })
        .ok_or_else(|| IntentError::InvalidChain(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain() {
        assert_eq!(parse_chain("0xAA36A7"), Ok(11155111));
        assert_eq!(parse_chain("1"), Ok(1));
        assert_eq!(parse_chain("local"), Ok(31337));
        assert!(parse_chain("0xzz").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("5"), Ok(U256::from(5)));
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("-1").is_err());
    }
}
