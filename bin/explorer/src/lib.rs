pub mod config;
pub mod intent;
pub mod metrics;
pub mod prompt;
pub mod render;

use alloy_primitives::Address;
use client::Wallet;
use crate::{intent::Intent, metrics::Metrics};
use ledger::{BalanceSnapshot, RemoteLedger, TokenMetadata, TransferReceipt};
use session::{SessionController, SessionError};
use tracing::warn;

/// What an executed intent produced.
#[derive(Debug)]
pub enum Outcome {
    Inspecting(TokenMetadata),
    Balance(BalanceSnapshot),
    Transferred(TransferReceipt),
    Connected(Address),
    Switched(::config::NetworkConfig),
    Show,
    Help,
    Quit,
}

/// Run one intent against the controller.
pub async fn execute<W, L>(
    controller: &SessionController<W, L>,
    intent: Intent,
    metrics: &Metrics,
) -> Result<Outcome, SessionError>
where
    W: Wallet,
    L: RemoteLedger<Context = W::Context>,
{
    let kind = intent.kind();

    let result = match intent {
        Intent::SetAddress(address) => {
            let unchanged = controller.session().map(|s| s.address()) == Some(address);
            let metadata = controller.set_address(address).await;
            if metadata.is_ok() && !unchanged {
                metrics.record_session_opened();
            }
            metadata.map(Outcome::Inspecting)
        }
        Intent::RequestBalance(owner) => controller
            .request_balance(owner)
            .await
            .map(Outcome::Balance),
        Intent::RequestOwnBalance => controller.request_own_balance().await.map(Outcome::Balance),
        Intent::SubmitTransfer { recipient, amount } => {
            let receipt = controller.submit_transfer(recipient, amount).await;
            if receipt.is_ok() {
                metrics.record_transfer_submitted();
            }
            receipt.map(Outcome::Transferred)
        }
        Intent::Connect => controller.connect().await.map(Outcome::Connected),
        Intent::SwitchNetwork(chain_id) => controller
            .switch_network(chain_id)
            .await
            .map(Outcome::Switched),
        Intent::Show => Ok(Outcome::Show),
        Intent::Help => Ok(Outcome::Help),
        Intent::Quit => Ok(Outcome::Quit),
    };

    metrics.record_intent(kind, result.is_ok());
    metrics.set_transaction_log_size(controller.snapshot().txs.len());
    if let Err(e) = &result {
        warn!(intent = kind, error = %e, "Intent failed");
    }

    result
}
