//! Contract sessions and the controller that owns them.
//!
//! A [`ContractSession`] binds one token contract to its metadata, one live
//! transfer subscription and an append-only transaction log. The
//! [`SessionController`] keeps at most one session active, replacing it
//! teardown-first whenever the inspected address changes.

pub mod controller;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use client::{AuthorizationError, NetworkError};
use ledger::LedgerError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub use controller::{SessionController, StateSnapshot};
pub use session::{
    ContractSession, LogObserver, Recorded, SessionId, SessionSnapshot, SessionState,
};

#[derive(Error, Debug)]
pub enum SessionError {
    /// A read or write against the ledger failed
    #[error(transparent)]
    Remote(#[from] LedgerError),

    /// The wallet refused a signing context
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// The network switch was rejected
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// An action needs a contract address first
    #[error("no active contract session, set a contract address first")]
    NoActiveSession,

    /// A newer address change overtook this one
    #[error("address change superseded by a newer request")]
    Superseded,

    #[error("session controller has been disposed")]
    Disposed,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
