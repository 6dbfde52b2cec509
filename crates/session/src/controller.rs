//! Session controller.
//!
//! Owns the single current-session slot. Address changes are linearized with
//! a generation counter: each change takes a new generation, tears down the
//! current session before doing anything remote, and installs its own session
//! only if no later change has started in the meantime.

use crate::{
    lock,
    session::{ContractSession, LogObserver, SessionId},
    SessionError,
};
use alloy_primitives::{Address, U256};
use client::Wallet;
use config::NetworkConfig;
use ledger::{
    BalanceSnapshot, ContractAddress, RemoteLedger, TokenMetadata, TransferEvent,
    TransferReceipt,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub contract_info: Option<TokenMetadata>,
    pub balance_info: Option<BalanceSnapshot>,
    pub txs: Vec<TransferEvent>,
}

struct Slot<L: RemoteLedger> {
    generation: u64,
    current: Option<Arc<ContractSession<L>>>,
    balance: Option<BalanceSnapshot>,
    disposed: bool,
}

impl<L: RemoteLedger> Slot<L> {
    /// Start a new generation and hand back the session to tear down.
    fn advance(&mut self) -> (u64, Option<Arc<ContractSession<L>>>) {
        self.generation += 1;
        self.balance = None;
        (self.generation, self.current.take())
    }
}

pub struct SessionController<W, L>
where
    W: Wallet,
    L: RemoteLedger<Context = W::Context>,
{
    wallet: W,
    slot: Mutex<Slot<L>>,
    observer: Option<LogObserver>,
}

impl<W, L> SessionController<W, L>
where
    W: Wallet,
    L: RemoteLedger<Context = W::Context>,
{
    pub const fn new(wallet: W) -> Self {
        Self {
            wallet,
            slot: Mutex::new(Slot {
                generation: 0,
                current: None,
                balance: None,
                disposed: false,
            }),
            observer: None,
        }
    }

    /// Report the transaction log length of every session after each append.
    pub fn with_log_observer(mut self, observer: LogObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Network the wallet currently points at.
    pub fn network(&self) -> NetworkConfig {
        self.wallet.network()
    }

    /// Inspect `address`.
    ///
    /// Setting the address already active returns its metadata without any
    /// remote call. Otherwise the current session is closed first, then the
    /// metadata of `address` is read and a new session opened. A failed read
    /// leaves no session; a call overtaken by a later one returns
    /// [`SessionError::Superseded`] and leaves no trace.
    pub async fn set_address(
        &self,
        address: ContractAddress,
    ) -> Result<TokenMetadata, SessionError> {
        let (generation, previous) = {
            let mut slot = lock(&self.slot);
            if slot.disposed {
                return Err(SessionError::Disposed);
            }
            if let Some(current) = slot.current.as_ref().filter(|s| s.address() == address) {
                debug!(contract = %address, "Address already active");
                return Ok(current.metadata().clone());
            }
            slot.advance()
        };

        if let Some(previous) = previous {
            previous.close().await;
        }

        let ledger = Arc::new(L::connect(self.wallet.read_only(), address));
        let metadata = ledger.read_metadata().await;

        if !self.is_current(generation) {
            debug!(contract = %address, generation, "Discarding superseded metadata read");
            return Err(SessionError::Superseded);
        }
        let metadata = metadata?;

        let session = match ContractSession::open(
            SessionId(generation),
            ledger,
            metadata,
            self.observer.clone(),
        )
        .await
        {
            Ok(session) => Arc::new(session),
            Err(_) if !self.is_current(generation) => return Err(SessionError::Superseded),
            Err(e) => return Err(e.into()),
        };

        let installed = {
            let mut slot = lock(&self.slot);
            let install = slot.generation == generation && !slot.disposed;
            if install {
                session.activate();
                slot.current = Some(session.clone());
            }
            install
        };

        if !installed {
            debug!(contract = %address, generation, "Discarding superseded session");
            session.close().await;
            return Err(SessionError::Superseded);
        }

        let metadata = session.metadata();
        info!(
            session = %session.id(),
            contract = %address,
            name = %metadata.name,
            symbol = %metadata.symbol,
            total_supply = %metadata.total_supply,
            "Inspecting token"
        );

        Ok(metadata.clone())
    }

    /// Balance of `owner` on the current contract.
    pub async fn request_balance(&self, owner: Address) -> Result<BalanceSnapshot, SessionError> {
        let session = self.current()?;
        self.read_balance(&session, owner).await
    }

    /// Balance of the wallet's own account on the current contract.
    pub async fn request_own_balance(&self) -> Result<BalanceSnapshot, SessionError> {
        let session = self.current()?;
        let signing = self.wallet.request_account_access().await?;
        self.read_balance(&session, signing.account).await
    }

    async fn read_balance(
        &self,
        session: &Arc<ContractSession<L>>,
        owner: Address,
    ) -> Result<BalanceSnapshot, SessionError> {
        let balance = session.ledger().read_balance(owner).await?;
        let snapshot = BalanceSnapshot {
            owner_address: owner,
            balance,
        };

        // Only keep it if the session it was read against is still current.
        let mut slot = lock(&self.slot);
        if slot.current.as_ref().map(|s| s.id()) == Some(session.id()) {
            slot.balance = Some(snapshot.clone());
        }

        Ok(snapshot)
    }

    /// Transfer `amount` of the current token to `recipient`.
    ///
    /// The transaction log is not touched here; the transfer shows up once
    /// the subscription delivers it.
    pub async fn submit_transfer(
        &self,
        recipient: Address,
        amount: U256,
    ) -> Result<TransferReceipt, SessionError> {
        let session = self.current()?;
        let signing = self.wallet.request_account_access().await?;

        let receipt = session
            .ledger()
            .submit_transfer(recipient, amount, &signing)
            .await?;

        info!(
            session = %session.id(),
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            "Transfer submitted"
        );
        Ok(receipt)
    }

    /// Request account access and return the granted account.
    pub async fn connect(&self) -> Result<Address, SessionError> {
        let signing = self.wallet.request_account_access().await?;
        info!(account = %signing.account, "Wallet connected");
        Ok(signing.account)
    }

    /// Switch the wallet to `chain_id`.
    ///
    /// On success the current session is closed, its address belonged to the
    /// previous chain. On failure nothing changes.
    pub async fn switch_network(&self, chain_id: u64) -> Result<NetworkConfig, SessionError> {
        if lock(&self.slot).disposed {
            return Err(SessionError::Disposed);
        }

        let network = self.wallet.request_network_switch(chain_id).await?;

        let (_, previous) = lock(&self.slot).advance();
        if let Some(previous) = previous {
            previous.close().await;
        }

        Ok(network)
    }

    /// Close the current session and refuse all further address changes.
    pub async fn dispose(&self) {
        let previous = {
            let mut slot = lock(&self.slot);
            slot.disposed = true;
            slot.advance().1
        };
        if let Some(previous) = previous {
            previous.close().await;
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let (session, balance_info) = {
            let slot = lock(&self.slot);
            (slot.current.clone(), slot.balance.clone())
        };

        match session {
            Some(session) => {
                let snapshot = session.snapshot();
                StateSnapshot {
                    contract_info: Some(snapshot.metadata),
                    balance_info,
                    txs: snapshot.log,
                }
            }
            None => StateSnapshot {
                balance_info,
                ..Default::default()
            },
        }
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<Arc<ContractSession<L>>> {
        lock(&self.slot).current.clone()
    }

    fn current(&self) -> Result<Arc<ContractSession<L>>, SessionError> {
        self.session().ok_or(SessionError::NoActiveSession)
    }

    fn is_current(&self, generation: u64) -> bool {
        let slot = lock(&self.slot);
        slot.generation == generation && !slot.disposed
    }
}
