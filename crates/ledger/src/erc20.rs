use crate::{
    ContractAddress, LedgerError, RemoteLedger, Subscription, TokenMetadata, TransferEvent,
    TransferReceipt, TransferSink,
};
use alloy_primitives::{Address, U256};
use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types_eth::{Filter, Log};
use alloy_sol_types::SolEvent;
use binding::token::ERC20;
use client::{RpcContext, Signing};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{task::JoinHandle, time};
use tracing::{debug, trace, warn};

/// How long a submitted transfer may take to be included.
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(180);

/// ERC20 client over a JSON-RPC provider.
#[derive(Clone)]
pub struct Erc20Ledger {
    context: RpcContext,
    address: ContractAddress,
}

impl Erc20Ledger {
    pub const fn new(context: RpcContext, address: ContractAddress) -> Self {
        Self { context, address }
    }
}

impl RemoteLedger for Erc20Ledger {
    type Context = RpcContext;
    type Subscription = TransferSubscription;

    fn connect(context: RpcContext, address: ContractAddress) -> Self {
        Self::new(context, address)
    }

    async fn read_metadata(&self) -> Result<TokenMetadata, LedgerError> {
        let address = self.address;
        debug!(contract = %address, "Reading token metadata");

        let contract = ERC20::new(address.get(), &self.context.provider);
        let name = contract.name();
        let symbol = contract.symbol();
        let total_supply = contract.totalSupply();

        let (name, symbol, total_supply) = tokio::try_join!(
            async {
                name.call()
                    .await
                    .map_err(|e| LedgerError::call("name", address, e))
            },
            async {
                symbol
                    .call()
                    .await
                    .map_err(|e| LedgerError::call("symbol", address, e))
            },
            async {
                total_supply
                    .call()
                    .await
                    .map_err(|e| LedgerError::call("totalSupply", address, e))
            },
        )?;

        Ok(TokenMetadata {
            address,
            name,
            symbol,
            total_supply,
        })
    }

    async fn read_balance(&self, owner: Address) -> Result<U256, LedgerError> {
        debug!(contract = %self.address, owner = %owner, "Reading balance");

        let contract = ERC20::new(self.address.get(), &self.context.provider);
        contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| LedgerError::call("balanceOf", self.address, e))
    }

    async fn submit_transfer(
        &self,
        recipient: Address,
        amount: U256,
        signing: &Signing<RpcContext>,
    ) -> Result<TransferReceipt, LedgerError> {
        debug!(
            contract = %self.address,
            from = %signing.account,
            to = %recipient,
            amount = %amount,
            "Submitting transfer"
        );

        let contract = ERC20::new(self.address.get(), &signing.context.provider);
        let pending = contract
            .transfer(recipient, amount)
            .from(signing.account)
            .send()
            .await
            .map_err(|e| LedgerError::call("transfer", self.address, e))?;

        let receipt = pending
            .with_timeout(Some(RECEIPT_TIMEOUT))
            .get_receipt()
            .await
            .map_err(|e| LedgerError::call("transfer", self.address, e))?;

        if !receipt.status() {
            return Err(LedgerError::Reverted(receipt.transaction_hash));
        }

        debug!(
            tx_hash = %receipt.transaction_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            "Transfer included"
        );

        Ok(TransferReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }

    async fn open_transfer_subscription(
        &self,
        sink: TransferSink,
    ) -> Result<TransferSubscription, LedgerError> {
        let address = self.address;
        let filter = Filter::new()
            .address(address.get())
            .event_signature(ERC20::Transfer::SIGNATURE_HASH);

        let provider = self.context.provider.clone();
        let id = provider
            .new_filter(&filter)
            .await
            .map_err(|e| LedgerError::subscription(address, e))?;

        debug!(contract = %address, filter_id = %id, "Installed transfer filter");

        let filter_id = Arc::new(Mutex::new(id));
        let task = tokio::spawn(poll_transfers(
            provider.clone(),
            address,
            filter,
            filter_id.clone(),
            self.context.poll_interval,
            sink,
        ));

        Ok(TransferSubscription {
            provider,
            address,
            filter_id,
            task,
        })
    }
}

/// Poll the node-side filter and feed decoded transfers to `sink`.
///
/// Nodes evict idle filters, and load-balanced endpoints may not know an id
/// installed on another backend. When the node rejects the filter id the
/// filter is installed again and polled right away; transfers emitted while
/// no filter existed are not recovered.
async fn poll_transfers(
    provider: DynProvider,
    address: ContractAddress,
    filter: Filter,
    filter_id: Arc<Mutex<U256>>,
    poll_interval: Duration,
    sink: TransferSink,
) {
    let mut interval = time::interval(poll_interval);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let id = current(&filter_id);
        let logs = match provider.get_filter_changes::<Log>(id).await {
            Ok(logs) => logs,
            Err(e) if e.as_error_resp().is_some_and(|p| filter_lost(&p.message)) => {
                warn!(contract = %address, filter_id = %id, error = %e, "Transfer filter lost");
                match provider.new_filter(&filter).await {
                    Ok(new_id) => {
                        debug!(
                            contract = %address,
                            filter_id = %new_id,
                            "Reinstalled transfer filter"
                        );
                        *filter_id.lock().unwrap_or_else(PoisonError::into_inner) = new_id;
                        interval.reset_immediately();
                    }
                    Err(e) => {
                        warn!(
                            contract = %address,
                            error = %e,
                            "Reinstalling transfer filter failed"
                        );
                    }
                }
                continue;
            }
            Err(e) => {
                warn!(contract = %address, error = %e, "Polling transfer filter failed");
                continue;
            }
        };

        for log in logs {
            match decode_transfer(&log) {
                Some(event) => sink(event),
                None => trace!(contract = %address, "Skipping undecodable log"),
            }
        }
    }
}

/// Whether a node error message says the filter id is unknown.
///
/// Geth and Erigon answer `filter not found`, Nethermind `Filter with id ...
/// does not exist`.
fn filter_lost(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("filter") && (message.contains("not found") || message.contains("not exist"))
}

fn current(filter_id: &Mutex<U256>) -> U256 {
    *filter_id.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decode a `Transfer` log. Logs removed by a reorg and pending logs without a
/// transaction hash yield `None`.
pub fn decode_transfer(log: &Log) -> Option<TransferEvent> {
    if log.removed {
        return None;
    }
    let tx_hash = log.transaction_hash?;
    let event = ERC20::Transfer::decode_log(&log.inner).ok()?;

    Some(TransferEvent {
        tx_hash,
        from: event.from,
        to: event.to,
        amount: event.value,
    })
}

/// Polling task plus the node-side filter it reads from.
pub struct TransferSubscription {
    provider: DynProvider,
    address: ContractAddress,
    /// Replaced whenever the poller reinstalls the filter
    filter_id: Arc<Mutex<U256>>,
    task: JoinHandle<()>,
}

impl TransferSubscription {
    fn filter_id(&self) -> U256 {
        current(&self.filter_id)
    }
}

impl Subscription for TransferSubscription {
    async fn cancel(self) -> Result<(), LedgerError> {
        // Stop local delivery first, the node-side cleanup may fail.
        self.task.abort();

        let filter_id = self.filter_id();
        let removed = self
            .provider
            .uninstall_filter(filter_id)
            .await
            .map_err(|e| LedgerError::subscription(self.address, e))?;

        if !removed {
            debug!(contract = %self.address, filter_id = %filter_id, "Filter already gone");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, LogData};
    use alloy_provider::{mock::Asserter, ProviderBuilder};
    use tokio::sync::mpsc;

    /// Ledger over a mocked transport. The long interval means the poller
    /// only polls again when it reinstalls the filter.
    fn mocked(asserter: &Asserter) -> Erc20Ledger {
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter.clone())
            .erased();
        let context = RpcContext {
            provider,
            poll_interval: Duration::from_secs(3600),
        };
        Erc20Ledger::new(
            context,
            ContractAddress::from(address!("00000000000000000000000000000000000000aa")),
        )
    }

    fn channel_sink() -> (TransferSink, mpsc::UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: TransferSink = Arc::new(move |event| {
            let _ = tx.send(event);
        });
        (sink, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<TransferEvent>) -> Option<TransferEvent> {
        time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no delivery within 5s")
    }

    fn transfer_log(removed: bool) -> Log {
        let event = ERC20::Transfer {
            from: address!("000000000000000000000000000000000000000b"),
            to: address!("000000000000000000000000000000000000000c"),
            value: U256::from(5),
        };
        let data: LogData = event.encode_log_data();

        Log {
            inner: alloy_primitives::Log {
                address: address!("00000000000000000000000000000000000000aa"),
                data,
            },
            transaction_hash: Some(b256!(
                "0000000000000000000000000000000000000000000000000000000000000001"
            )),
            removed,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_transfer() {
        let event = decode_transfer(&transfer_log(false)).unwrap();

        assert_eq!(event.from, address!("000000000000000000000000000000000000000b"));
        assert_eq!(event.to, address!("000000000000000000000000000000000000000c"));
        assert_eq!(event.amount, U256::from(5));
    }

    #[test]
    fn test_decode_skips_removed_logs() {
        assert!(decode_transfer(&transfer_log(true)).is_none());
    }

    #[test]
    fn test_decode_skips_pending_logs() {
        let mut log = transfer_log(false);
        log.transaction_hash = None;
        assert!(decode_transfer(&log).is_none());
    }

    #[test]
    fn test_filter_lost_messages() {
        assert!(filter_lost("filter not found"));
        assert!(filter_lost("Filter with id: 0x7 does not exist."));
        assert!(!filter_lost("rate limit exceeded"));
        assert!(!filter_lost("header not found"));
    }

    #[tokio::test]
    async fn test_subscription_delivers_then_uninstalls() {
        let asserter = Asserter::new();
        asserter.push_success(&U256::from(7));
        asserter.push_success(&vec![transfer_log(false)]);

        let (sink, mut rx) = channel_sink();
        let subscription = mocked(&asserter)
            .open_transfer_subscription(sink)
            .await
            .unwrap();

        let event = next(&mut rx).await.unwrap();
        assert_eq!(event.amount, U256::from(5));
        assert_eq!(subscription.filter_id(), U256::from(7));

        asserter.push_success(&true);
        subscription.cancel().await.unwrap();
        assert!(asserter.read_q().is_empty());
        assert!(next(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_lost_filter_is_reinstalled() {
        let asserter = Asserter::new();
        asserter.push_success(&U256::from(7));
        asserter.push_failure_msg("filter not found");
        asserter.push_success(&U256::from(8));
        asserter.push_success(&vec![transfer_log(false)]);

        let (sink, mut rx) = channel_sink();
        let subscription = mocked(&asserter)
            .open_transfer_subscription(sink)
            .await
            .unwrap();

        let event = next(&mut rx).await.unwrap();
        assert_eq!(event.to, address!("000000000000000000000000000000000000000c"));
        assert_eq!(subscription.filter_id(), U256::from(8));

        asserter.push_success(&true);
        subscription.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stops_polling_even_when_uninstall_fails() {
        let asserter = Asserter::new();
        asserter.push_success(&U256::from(7));
        asserter.push_success(&vec![transfer_log(false)]);

        let (sink, mut rx) = channel_sink();
        let subscription = mocked(&asserter)
            .open_transfer_subscription(sink)
            .await
            .unwrap();
        next(&mut rx).await.unwrap();

        asserter.push_failure_msg("connection reset");
        let result = subscription.cancel().await;

        assert!(matches!(result, Err(LedgerError::Subscription { .. })));
        // The aborted poller dropped the sink.
        assert!(next(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_open_failure() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("method not supported");

        let (sink, _rx) = channel_sink();
        let result = mocked(&asserter).open_transfer_subscription(sink).await;

        assert!(matches!(result, Err(LedgerError::Subscription { .. })));
    }
}
