//! The contract session state machine.
//!
//! `Initializing -> Active -> Closed`, one way. A session is created with
//! already-fetched metadata and an open subscription, activated by its owner,
//! and closed exactly once. Closing releases the subscription; nothing
//! mutates the log afterwards.

use crate::lock;
use alloy_primitives::TxHash;
use ledger::{
    ContractAddress, LedgerError, RemoteLedger, Subscription, TokenMetadata, TransferEvent,
    TransferSink,
};
use serde::Serialize;
use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex, Weak},
};
use tracing::{debug, info, warn};

/// Identity of one session, unique for the lifetime of its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Initializing,
    Active,
    Closed,
}

/// Outcome of delivering one event to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Appended,
    /// An entry with the same transaction hash is already logged
    Duplicate,
    /// The session is closed
    Discarded,
}

#[derive(Debug)]
struct TransactionLog {
    state: SessionState,
    entries: Vec<TransferEvent>,
    seen: HashSet<TxHash>,
}

impl TransactionLog {
    fn new() -> Self {
        Self {
            state: SessionState::Initializing,
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn record(&mut self, event: TransferEvent) -> Recorded {
        if self.state == SessionState::Closed {
            return Recorded::Discarded;
        }
        if !self.seen.insert(event.tx_hash) {
            return Recorded::Duplicate;
        }
        self.entries.push(event);
        Recorded::Appended
    }
}

/// Called with the new log length after each appended transfer.
pub type LogObserver = Arc<dyn Fn(usize) + Send + Sync>;

/// Read-only copy of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub state: SessionState,
    pub metadata: TokenMetadata,
    /// Entries in arrival order
    pub log: Vec<TransferEvent>,
}

pub struct ContractSession<L: RemoteLedger> {
    id: SessionId,
    ledger: Arc<L>,
    metadata: TokenMetadata,
    log: Arc<Mutex<TransactionLog>>,
    observer: Option<LogObserver>,
    subscription: Mutex<Option<L::Subscription>>,
}

impl<L: RemoteLedger> ContractSession<L> {
    /// Create a session for `metadata` and open its transfer subscription.
    ///
    /// The subscription delivers into this session's log only. The session
    /// stays `Initializing` until [`activate`](Self::activate) is called.
    /// `observer` sees the log length after every append.
    pub async fn open(
        id: SessionId,
        ledger: Arc<L>,
        metadata: TokenMetadata,
        observer: Option<LogObserver>,
    ) -> Result<Self, LedgerError> {
        let log = Arc::new(Mutex::new(TransactionLog::new()));
        let sink = bind_sink(id, metadata.address, Arc::downgrade(&log), observer.clone());

        let subscription = ledger.open_transfer_subscription(sink).await?;
        debug!(session = %id, contract = %metadata.address, "Transfer subscription opened");

        Ok(Self {
            id,
            ledger,
            metadata,
            log,
            observer,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub const fn address(&self) -> ContractAddress {
        self.metadata.address
    }

    pub const fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Ledger client bound to this session's address.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn state(&self) -> SessionState {
        lock(&self.log).state
    }

    /// `Initializing -> Active`. Returns false from any other state.
    pub fn activate(&self) -> bool {
        let mut log = lock(&self.log);
        if log.state != SessionState::Initializing {
            return false;
        }
        log.state = SessionState::Active;
        info!(session = %self.id, contract = %self.address(), "Session active");
        true
    }

    /// Append `event` unless its transaction hash is already logged.
    pub fn record_event(&self, event: TransferEvent) -> Recorded {
        record(self.id, &self.log, event, self.observer.as_ref())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let log = lock(&self.log);
        SessionSnapshot {
            id: self.id,
            state: log.state,
            metadata: self.metadata.clone(),
            log: log.entries.clone(),
        }
    }

    /// Transition to `Closed` and cancel the subscription.
    ///
    /// Idempotent. A failing cancellation is logged; the session is closed
    /// either way and discards any later delivery.
    pub async fn close(&self) {
        let subscription = {
            let mut log = lock(&self.log);
            if log.state == SessionState::Closed {
                return;
            }
            log.state = SessionState::Closed;
            lock(&self.subscription).take()
        };

        info!(session = %self.id, contract = %self.address(), "Session closed");

        if let Some(subscription) = subscription {
            if let Err(e) = subscription.cancel().await {
                warn!(
                    session = %self.id,
                    contract = %self.address(),
                    error = %e,
                    "Failed to cancel transfer subscription"
                );
            }
        }
    }
}

impl<L: RemoteLedger> Drop for ContractSession<L> {
    fn drop(&mut self) {
        let leaked = self
            .subscription
            .get_mut()
            .map(|s| s.is_some())
            .unwrap_or(true);
        if leaked {
            warn!(session = %self.id, "Session dropped without close");
        }
    }
}

impl<L: RemoteLedger> fmt::Debug for ContractSession<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractSession")
            .field("id", &self.id)
            .field("address", &self.address())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn record(
    id: SessionId,
    log: &Mutex<TransactionLog>,
    event: TransferEvent,
    observer: Option<&LogObserver>,
) -> Recorded {
    let tx_hash = event.tx_hash;
    let (outcome, len) = {
        let mut log = lock(log);
        let outcome = log.record(event);
        (outcome, log.entries.len())
    };
    match outcome {
        Recorded::Appended => {
            debug!(session = %id, tx_hash = %tx_hash, "Transfer recorded");
            if let Some(observer) = observer {
                observer(len);
            }
        }
        Recorded::Duplicate => debug!(session = %id, tx_hash = %tx_hash, "Duplicate transfer"),
        Recorded::Discarded => {
            debug!(session = %id, tx_hash = %tx_hash, "Transfer after close discarded")
        }
    }
    outcome
}

/// Delivery callback bound to one session's log.
///
/// Holds the log weakly so a late delivery can neither keep a dropped
/// session alive nor reach any other session.
fn bind_sink(
    id: SessionId,
    address: ContractAddress,
    log: Weak<Mutex<TransactionLog>>,
    observer: Option<LogObserver>,
) -> TransferSink {
    Arc::new(move |event| match log.upgrade() {
        Some(log) => {
            record(id, &log, event, observer.as_ref());
        }
        None => debug!(session = %id, contract = %address, "Delivery to dropped session"),
    })
}
