//! In-memory ledger and wallet doubles.
//!
//! [`MockChain`] stands in for the network: it knows which token contracts
//! exist, holds balances, records every subscription, and lets a test push
//! transfer events or hold a metadata read open until released.

use crate::lock;
use alloy_primitives::{Address, TxHash, U256};
use client::{AuthorizationError, NetworkError, Signing, Wallet};
use config::{NetworkConfig, NetworkRegistry};
use ledger::{
    ContractAddress, LedgerError, RemoteLedger, Subscription, TokenMetadata, TransferEvent,
    TransferReceipt, TransferSink,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::Notify;

/// Address from a short hex tag, e.g. `"0xB"` becomes `0x00..0b`.
pub fn addr(tag: &str) -> Address {
    let digits = tag.trim_start_matches("0x");
    format!("0x{digits:0>40}")
        .parse()
        .unwrap_or_else(|_| panic!("bad address tag {tag}"))
}

pub fn tx_hash(n: u64) -> TxHash {
    TxHash::from(U256::from(n).to_be_bytes::<32>())
}

pub fn event(n: u64, from: &str, to: &str, amount: u64) -> TransferEvent {
    TransferEvent {
        tx_hash: tx_hash(n),
        from: addr(from),
        to: addr(to),
        amount: U256::from(amount),
    }
}

/// The `Tok` token used across tests.
pub fn metadata(address: ContractAddress) -> TokenMetadata {
    TokenMetadata {
        address,
        name: "Tok".to_string(),
        symbol: "TOK".to_string(),
        total_supply: U256::from_str_radix("1000000000000000000000000", 10)
            .unwrap_or_default(),
    }
}

/// Subscription operation as seen by the chain, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOp {
    Open(ContractAddress),
    Cancel(ContractAddress),
}

struct SubscriptionEntry {
    address: ContractAddress,
    sink: TransferSink,
    cancelled: bool,
}

#[derive(Default)]
struct ChainState {
    tokens: HashMap<ContractAddress, TokenMetadata>,
    balances: HashMap<(ContractAddress, Address), U256>,
    holds: HashMap<ContractAddress, Arc<Notify>>,
    subscriptions: Vec<SubscriptionEntry>,
    journal: Vec<ChainOp>,
    connects: usize,
    metadata_reads: usize,
    cancellations: usize,
    transactions: u64,
    fail_subscriptions: bool,
    fail_cancellations: bool,
}

#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deploy a token at `address`.
    pub fn deploy(&self, metadata: TokenMetadata) {
        lock(&self.state).tokens.insert(metadata.address, metadata);
    }

    pub fn set_balance(&self, token: ContractAddress, owner: Address, balance: U256) {
        lock(&self.state).balances.insert((token, owner), balance);
    }

    pub fn balance(&self, token: ContractAddress, owner: Address) -> U256 {
        lock(&self.state)
            .balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default()
    }

    /// Suspend metadata reads of `address` until [`release`](Self::release).
    pub fn hold(&self, address: ContractAddress) {
        lock(&self.state)
            .holds
            .insert(address, Arc::new(Notify::new()));
    }

    pub fn release(&self, address: ContractAddress) {
        if let Some(gate) = lock(&self.state).holds.remove(&address) {
            gate.notify_one();
        }
    }

    pub fn fail_subscriptions(&self, fail: bool) {
        lock(&self.state).fail_subscriptions = fail;
    }

    pub fn fail_cancellations(&self, fail: bool) {
        lock(&self.state).fail_cancellations = fail;
    }

    /// Deliver `event` to every live subscription on `address`.
    pub fn emit(&self, address: ContractAddress, event: TransferEvent) {
        self.deliver(address, event, false);
    }

    /// Deliver `event` to cancelled subscriptions as well, the way a
    /// notification already in flight at cancellation time would arrive.
    pub fn emit_including_cancelled(&self, address: ContractAddress, event: TransferEvent) {
        self.deliver(address, event, true);
    }

    fn deliver(&self, address: ContractAddress, event: TransferEvent, include_cancelled: bool) {
        let sinks: Vec<TransferSink> = lock(&self.state)
            .subscriptions
            .iter()
            .filter(|s| s.address == address && (include_cancelled || !s.cancelled))
            .map(|s| s.sink.clone())
            .collect();

        for sink in sinks {
            sink(event.clone());
        }
    }

    /// Ledger clients constructed so far.
    pub fn connects(&self) -> usize {
        lock(&self.state).connects
    }

    /// Metadata reads started so far.
    pub fn metadata_reads(&self) -> usize {
        lock(&self.state).metadata_reads
    }

    pub fn subscriptions_opened(&self) -> usize {
        lock(&self.state).subscriptions.len()
    }

    pub fn live_subscriptions(&self, address: ContractAddress) -> usize {
        lock(&self.state)
            .subscriptions
            .iter()
            .filter(|s| s.address == address && !s.cancelled)
            .count()
    }

    pub fn cancellations(&self) -> usize {
        lock(&self.state).cancellations
    }

    /// Every subscription open and cancel issued so far.
    pub fn journal(&self) -> Vec<ChainOp> {
        lock(&self.state).journal.clone()
    }
}

pub struct MockLedger {
    chain: Arc<MockChain>,
    address: ContractAddress,
}

impl RemoteLedger for MockLedger {
    type Context = Arc<MockChain>;
    type Subscription = MockSubscription;

    fn connect(chain: Arc<MockChain>, address: ContractAddress) -> Self {
        lock(&chain.state).connects += 1;
        Self { chain, address }
    }

    async fn read_metadata(&self) -> Result<TokenMetadata, LedgerError> {
        let gate = {
            let mut state = lock(&self.chain.state);
            state.metadata_reads += 1;
            state.holds.get(&self.address).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        lock(&self.chain.state)
            .tokens
            .get(&self.address)
            .cloned()
            .ok_or_else(|| LedgerError::call("name", self.address, "execution reverted"))
    }

    async fn read_balance(&self, owner: Address) -> Result<U256, LedgerError> {
        let state = lock(&self.chain.state);
        if !state.tokens.contains_key(&self.address) {
            return Err(LedgerError::call("balanceOf", self.address, "execution reverted"));
        }
        Ok(state
            .balances
            .get(&(self.address, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn submit_transfer(
        &self,
        recipient: Address,
        amount: U256,
        signing: &Signing<Arc<MockChain>>,
    ) -> Result<TransferReceipt, LedgerError> {
        let (event, block_number) = {
            let mut state = lock(&self.chain.state);
            state.transactions += 1;
            let block_number = state.transactions;
            let hash = tx_hash(1_000_000 + block_number);

            let from_key = (self.address, signing.account);
            let available = state.balances.get(&from_key).copied().unwrap_or_default();
            if available < amount {
                return Err(LedgerError::Reverted(hash));
            }
            state.balances.insert(from_key, available - amount);
            *state
                .balances
                .entry((self.address, recipient))
                .or_default() += amount;

            let event = TransferEvent {
                tx_hash: hash,
                from: signing.account,
                to: recipient,
                amount,
            };
            (event, block_number)
        };

        let receipt = TransferReceipt {
            tx_hash: event.tx_hash,
            block_number: Some(block_number),
            gas_used: 51_000,
        };
        self.chain.emit(self.address, event);

        Ok(receipt)
    }

    async fn open_transfer_subscription(
        &self,
        sink: TransferSink,
    ) -> Result<MockSubscription, LedgerError> {
        let mut state = lock(&self.chain.state);
        if state.fail_subscriptions {
            return Err(LedgerError::subscription(self.address, "filter not supported"));
        }
        state.journal.push(ChainOp::Open(self.address));
        state.subscriptions.push(SubscriptionEntry {
            address: self.address,
            sink,
            cancelled: false,
        });

        Ok(MockSubscription {
            chain: self.chain.clone(),
            index: state.subscriptions.len() - 1,
        })
    }
}

pub struct MockSubscription {
    chain: Arc<MockChain>,
    index: usize,
}

impl Subscription for MockSubscription {
    async fn cancel(self) -> Result<(), LedgerError> {
        let mut state = lock(&self.chain.state);
        let address = state.subscriptions[self.index].address;
        state.cancellations += 1;
        state.subscriptions[self.index].cancelled = true;
        state.journal.push(ChainOp::Cancel(address));

        if state.fail_cancellations {
            return Err(LedgerError::subscription(address, "connection reset"));
        }
        Ok(())
    }
}

/// Wallet double whose contexts all point at one [`MockChain`].
pub struct MockWallet {
    chain: Arc<MockChain>,
    account: Option<Address>,
    registry: NetworkRegistry,
    network: Mutex<NetworkConfig>,
}

impl MockWallet {
    pub fn new(chain: Arc<MockChain>, account: Option<Address>) -> Self {
        Self {
            chain,
            account,
            registry: NetworkRegistry::default(),
            network: Mutex::new(NetworkConfig::local()),
        }
    }
}

impl Wallet for MockWallet {
    type Context = Arc<MockChain>;

    fn read_only(&self) -> Arc<MockChain> {
        self.chain.clone()
    }

    fn network(&self) -> NetworkConfig {
        lock(&self.network).clone()
    }

    async fn request_account_access(&self) -> Result<Signing<Arc<MockChain>>, AuthorizationError> {
        let account = self.account.ok_or(AuthorizationError::NoWallet)?;
        Ok(Signing {
            account,
            context: self.chain.clone(),
        })
    }

    async fn request_network_switch(&self, chain_id: u64) -> Result<NetworkConfig, NetworkError> {
        let network = self
            .registry
            .by_chain_id(chain_id)
            .cloned()
            .ok_or(NetworkError::Unsupported(chain_id))?;
        *lock(&self.network) = network.clone();
        Ok(network)
    }
}
