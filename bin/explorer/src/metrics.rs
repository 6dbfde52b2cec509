//! Prometheus metrics for the explorer.
//!
//! All metrics are aggregated in the [`Metrics`] struct.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use session::LogObserver;
use std::sync::Arc;

/// Aggregated metrics for the explorer.
///
/// Metrics are registered with the global metrics registry on creation.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance and register all metric descriptions.
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        describe_counter!(
            "explorer_intents_success_total",
            "Total successful intents by kind"
        );
        describe_counter!(
            "explorer_intents_failure_total",
            "Total failed intents by kind"
        );
        describe_counter!(
            "explorer_sessions_opened_total",
            "Total number of contract sessions opened"
        );
        describe_counter!(
            "explorer_transfers_submitted_total",
            "Total number of transfers included on chain"
        );
        describe_gauge!(
            "explorer_transaction_log_size",
            "Transfers observed by the current session"
        );
    }

    /// Record the outcome of one intent.
    pub fn record_intent(&self, kind: &str, success: bool) {
        if success {
            counter!("explorer_intents_success_total", "intent" => kind.to_string()).increment(1);
        } else {
            counter!("explorer_intents_failure_total", "intent" => kind.to_string()).increment(1);
        }
    }

    pub fn record_session_opened(&self) {
        counter!("explorer_sessions_opened_total").increment(1);
    }

    pub fn record_transfer_submitted(&self) {
        counter!("explorer_transfers_submitted_total").increment(1);
    }

    pub fn set_transaction_log_size(&self, size: usize) {
        gauge!("explorer_transaction_log_size").set(size as f64);
    }

    /// Observer that keeps the transaction log gauge current as transfers
    /// stream in between intents.
    pub fn log_size_observer(&self) -> LogObserver {
        let metrics = self.clone();
        Arc::new(move |size| metrics.set_transaction_log_size(size))
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
