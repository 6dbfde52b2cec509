//! Line-oriented prompt driving a [`SessionController`].

use crate::{
    execute,
    intent::{Intent, HELP},
    metrics::Metrics,
    render::{format_snapshot, OutputFormat},
    Outcome,
};
use client::Wallet;
use config::NetworkConfig;
use ledger::RemoteLedger;
use session::SessionController;
use std::{future::Future, io};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

/// Why the prompt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    EndOfInput,
    Interrupted,
}

pub struct Prompt<'a, W, L>
where
    W: Wallet,
    L: RemoteLedger<Context = W::Context>,
{
    controller: &'a SessionController<W, L>,
    metrics: &'a Metrics,
    format: OutputFormat,
}

impl<'a, W, L> Prompt<'a, W, L>
where
    W: Wallet,
    L: RemoteLedger<Context = W::Context>,
{
    pub const fn new(
        controller: &'a SessionController<W, L>,
        metrics: &'a Metrics,
        format: OutputFormat,
    ) -> Self {
        Self {
            controller,
            metrics,
            format,
        }
    }

    /// Run `startup`, then every intent read from `input`, until the user
    /// quits, the input ends or `shutdown` resolves.
    ///
    /// `shutdown` is raced against both reading a line and executing an
    /// intent, so an intent stuck on the network does not block it. The
    /// controller is disposed on every exit.
    pub async fn run<R, O, S>(
        &self,
        startup: Option<Intent>,
        input: R,
        mut out: O,
        shutdown: S,
    ) -> io::Result<Exit>
    where
        R: AsyncBufRead + Unpin,
        O: io::Write,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let exit: io::Result<Exit> = async {
            if let Some(intent) = startup {
                let keep_going = tokio::select! {
                    keep_going = self.handle(intent, &mut out) => keep_going?,
                    () = &mut shutdown => return Ok(Exit::Interrupted),
                };
                if !keep_going {
                    return Ok(Exit::Quit);
                }
            }

            writeln!(out, "{HELP}")?;
            let mut lines = input.lines();

            loop {
                write!(out, "> ")?;
                out.flush()?;

                let line = tokio::select! {
                    line = lines.next_line() => line?,
                    () = &mut shutdown => return Ok(Exit::Interrupted),
                };
                let Some(line) = line else {
                    return Ok(Exit::EndOfInput);
                };

                let intent = match line.parse::<Intent>() {
                    Ok(intent) => intent,
                    Err(e) => {
                        writeln!(out, "{e}")?;
                        continue;
                    }
                };

                let keep_going = tokio::select! {
                    keep_going = self.handle(intent, &mut out) => keep_going?,
                    () = &mut shutdown => return Ok(Exit::Interrupted),
                };
                if !keep_going {
                    return Ok(Exit::Quit);
                }
            }
        }
        .await;

        if exit.as_ref().is_ok_and(|e| *e == Exit::Interrupted) {
            info!("Interrupted");
        }
        self.controller.dispose().await;

        exit
    }

    /// Execute and report one intent. Returns false once the user quits.
    async fn handle<O: io::Write>(&self, intent: Intent, out: &mut O) -> io::Result<bool> {
        let network = self.controller.network();

        match execute(self.controller, intent, self.metrics).await {
            Ok(Outcome::Quit) => return Ok(false),
            Ok(Outcome::Help) => {
                writeln!(out, "{HELP}")?;
                return Ok(true);
            }
            Ok(outcome) => {
                if let Some(line) = describe(&outcome, &network) {
                    writeln!(out, "{line}")?;
                }
            }
            Err(e) => {
                writeln!(out, "error: {e}")?;
                return Ok(true);
            }
        }

        writeln!(
            out,
            "{}",
            format_snapshot(
                &self.controller.snapshot(),
                &self.controller.network(),
                self.format
            )
        )?;
        Ok(true)
    }
}

/// One line summarizing `outcome`, rendered against the network it ran on.
fn describe(outcome: &Outcome, network: &NetworkConfig) -> Option<String> {
    match outcome {
        Outcome::Inspecting(info) => Some(format!(
            "Inspecting {} ({}) at {}",
            info.name, info.symbol, info.address
        )),
        Outcome::Balance(balance) => Some(format!(
            "Balance of {}: {}",
            balance.owner_address, balance.balance
        )),
        Outcome::Transferred(receipt) => {
            let link = network
                .tx_url(receipt.tx_hash)
                .unwrap_or_else(|| receipt.tx_hash.to_string());
            let block = receipt
                .block_number
                .map_or_else(|| "?".to_string(), |n| n.to_string());
            Some(format!("Transfer included in block {block}: {link}"))
        }
        Outcome::Connected(account) => Some(format!("Connected account {account}")),
        Outcome::Switched(network) => Some(format!(
            "Switched to {} (chain {})",
            network.network_type, network.chain_id
        )),
        Outcome::Show | Outcome::Help | Outcome::Quit => None,
    }
}
