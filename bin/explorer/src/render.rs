use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Table};
use config::NetworkConfig;
use ledger::TransferEvent;
use session::StateSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn format_snapshot(
    snapshot: &StateSnapshot,
    network: &NetworkConfig,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Table => format_snapshot_table(snapshot, network),
        OutputFormat::Json => serde_json::to_string_pretty(snapshot)
            .unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}")),
    }
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

fn format_snapshot_table(snapshot: &StateSnapshot, network: &NetworkConfig) -> String {
    let mut token = table();
    token.set_header(vec!["Contract", "Name", "Symbol", "Total Supply"]);
    match &snapshot.contract_info {
        Some(info) => token.add_row(vec![
            Cell::new(info.address),
            Cell::new(&info.name),
            Cell::new(&info.symbol),
            Cell::new(info.total_supply),
        ]),
        None => token.add_row(vec!["-", "-", "-", "-"]),
    };

    let mut balance = table();
    balance.set_header(vec!["Address", "Balance"]);
    match &snapshot.balance_info {
        Some(info) => balance.add_row(vec![
            Cell::new(info.owner_address),
            Cell::new(info.balance),
        ]),
        None => balance.add_row(vec!["-", "-"]),
    };

    format!(
        "{token}\n{balance}\nRecent transactions on {} (chain {}):\n{}",
        network.network_type,
        network.chain_id,
        format_transfers(&snapshot.txs, network)
    )
}

/// Transfers in arrival order, each with its block explorer link when the
/// network has one.
pub fn format_transfers(transfers: &[TransferEvent], network: &NetworkConfig) -> String {
    if transfers.is_empty() {
        return "No transfers observed yet.".to_string();
    }

    let mut table = table();
    table.set_header(vec!["From", "To", "Amount", "Transaction"]);

    for transfer in transfers {
        let link = network
            .tx_url(transfer.tx_hash)
            .unwrap_or_else(|| transfer.tx_hash.to_string());
        table.add_row(vec![
            Cell::new(transfer.from),
            Cell::new(transfer.to),
            Cell::new(transfer.amount),
            Cell::new(link),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, TxHash, U256};

    fn transfer() -> TransferEvent {
        TransferEvent {
            tx_hash: TxHash::repeat_byte(0x11),
            from: Address::repeat_byte(0x0b),
            to: Address::repeat_byte(0x0c),
            amount: U256::from(5),
        }
    }

    #[test]
    fn test_transfers_link_to_explorer() {
        let out = format_transfers(&[transfer()], &NetworkConfig::sepolia());
        assert!(out.contains("https://sepolia.etherscan.io/tx/0x1111"));
    }

    #[test]
    fn test_transfers_without_explorer() {
        let out = format_transfers(&[transfer()], &NetworkConfig::local());
        assert!(out.contains("0x1111"));
        assert!(!out.contains("etherscan"));
    }

    #[test]
    fn test_empty_snapshot_table() {
        let out = format_snapshot(
            &StateSnapshot::default(),
            &NetworkConfig::sepolia(),
            OutputFormat::Table,
        );
        assert!(out.contains("Total Supply"));
        assert!(out.contains("No transfers observed yet."));
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = StateSnapshot {
            txs: vec![transfer()],
            ..Default::default()
        };
        let out = format_snapshot(&snapshot, &NetworkConfig::sepolia(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert!(value["contractInfo"].is_null());
        assert_eq!(value["txs"][0]["amount"], "5");
    }
}
