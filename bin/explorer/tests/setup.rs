//! Shared setup for explorer integration tests.
//!
//! Tests run against the in-memory chain from `session::testing`, so no
//! node is required.

#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use explorer::metrics::Metrics;
use ledger::ContractAddress;
use session::{
    testing::{addr, metadata, MockChain, MockLedger, MockWallet},
    SessionController,
};
use std::sync::Arc;

pub type Controller = SessionController<MockWallet, MockLedger>;

pub struct Harness {
    pub chain: Arc<MockChain>,
    pub controller: Controller,
    pub metrics: Metrics,
    pub token: ContractAddress,
    pub account: Address,
}

/// A chain with one deployed token and a wallet account holding 1000 units.
pub fn setup() -> Harness {
    let chain = MockChain::new();
    let token = ContractAddress::from(addr("0xA"));
    let account = addr("0xB");

    chain.deploy(metadata(token));
    chain.set_balance(token, account, U256::from(1000));

    let wallet = MockWallet::new(chain.clone(), Some(account));
    let metrics = Metrics::new();
    Harness {
        controller: SessionController::new(wallet).with_log_observer(metrics.log_size_observer()),
        metrics,
        chain,
        token,
        account,
    }
}
