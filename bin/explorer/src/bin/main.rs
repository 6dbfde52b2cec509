use clap::Parser;
use client::InjectedWallet;
use explorer::{
    config::Config,
    intent::Intent,
    metrics::{install_prometheus_exporter, Metrics},
    prompt::Prompt,
    render::OutputFormat,
};
use ledger::Erc20Ledger;
use session::SessionController;
use std::path::Path;
use tokio::io::BufReader;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "explorer")]
#[command(about = "Inspect and interact with an ERC20 token contract")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Private key for signing transfers (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Print state snapshots as JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = if Path::new(&cli.config).exists() {
        info!("Loading config: {}", cli.config);
        Config::from_file(&cli.config)?
    } else {
        warn!("Config {} not found, using defaults", cli.config);
        Config::default()
    };

    let network = config.network_config();
    info!("Loaded config:");
    info!("  Network: {} (chain {})", network.network_type, network.chain_id);
    info!("  RPC URL: {}", network.rpc_url);
    info!("  Poll interval: {:?}", config.poll_interval());

    let metrics = Metrics::new();
    if let Some(port) = config.metrics_port {
        install_prometheus_exporter(port)?;
        info!("  Metrics: 0.0.0.0:{}", port);
    }

    let signer = cli
        .private_key
        .as_deref()
        .map(client::parse_signer)
        .transpose()?;
    if signer.is_none() {
        info!("No private key given, transfers and account access are unavailable");
    }

    let wallet = InjectedWallet::new(config.registry(), network, signer, config.poll_interval())?;
    let controller: SessionController<InjectedWallet, Erc20Ledger> =
        SessionController::new(wallet).with_log_observer(metrics.log_size_observer());

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    // One listener for the whole run; it also covers intents in flight.
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let exit = Prompt::new(&controller, &metrics, format)
        .run(
            config.contract_address.map(Intent::SetAddress),
            BufReader::new(tokio::io::stdin()),
            std::io::stdout(),
            shutdown,
        )
        .await?;

    info!(exit = ?exit, "Explorer stopped");

    // The blocking stdin reader may still be parked in read(2) and would keep
    // the runtime from shutting down.
    std::process::exit(0)
}
