use std::{path::PathBuf, sync::Arc};

use alloy_primitives::U256;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dapp_core::{format_major_units, parse_major_units, DappController, ProviderRegistry};
use shared::protocol::{DappEvent, TransactionResult};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "taxicash", about = "TaxiCash payments and rewards client")]
struct Cli {
    /// Wallet to connect with: metamask, trustwallet, valora or celowallet.
    #[arg(long, global = true, default_value = "metamask")]
    wallet: String,
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and print fee, rewards and ownership for the account.
    Status,
    Pay {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
    },
    Refer {
        #[arg(long)]
        code: String,
    },
    Withdraw,
    /// Convert a major-unit amount to its 18-decimal base-unit value.
    ToWei { amount: String },
    /// Convert a base-unit value to major units.
    FromWei { value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::ToWei { amount } => {
            println!("{}", parse_major_units(amount)?);
            return Ok(());
        }
        Command::FromWei { value } => {
            let value = value
                .trim()
                .parse::<U256>()
                .with_context(|| format!("invalid base-unit value '{value}'"))?;
            println!("{}", format_major_units(value));
            return Ok(());
        }
        _ => {}
    }

    let settings = load_settings(&cli.config);
    let globals = settings.injected_globals()?;
    if globals.is_empty() {
        warn!(config = %cli.config.display(), "taxicash: no wallet endpoints configured");
    }
    let controller = DappController::new(
        ProviderRegistry::new(Arc::new(globals)),
        settings.dapp_config()?,
    );
    let detected: Vec<&str> = controller
        .sessions()
        .registry()
        .available()
        .iter()
        .map(|kind| kind.id())
        .collect();
    info!(
        config = %cli.config.display(),
        contract = %controller.contract().address(),
        ?detected,
        "taxicash: starting"
    );
    tokio::spawn(log_events(controller.subscribe_events()));

    let connected = controller.request_connect_by_id(&cli.wallet).await;

    let result = match cli.command {
        Command::Status => {
            let snapshot = controller.snapshot();
            if let Some(account) = snapshot.short_account() {
                info!(%account, status = ?snapshot.status, "taxicash: wallet connected");
            }
            print_snapshot(&controller)?;
            return connected.context("wallet connection failed");
        }
        Command::Pay { to, amount } => controller.request_payment(&to, &amount).await,
        Command::Refer { code } => controller.request_referral(&code).await,
        Command::Withdraw => controller.request_withdraw().await,
        Command::ToWei { .. } | Command::FromWei { .. } => return Ok(()),
    };

    print_snapshot(&controller)?;
    report(&result)
}

fn print_snapshot(controller: &DappController) -> Result<()> {
    let snapshot = controller.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn report(result: &TransactionResult) -> Result<()> {
    let message = result.notification();
    if result.is_success() {
        info!(kind = %result.kind, tx_hash = ?result.tx_hash(), "{message}");
        Ok(())
    } else {
        bail!(message)
    }
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<DappEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => debug!(?event, "taxicash: event"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "taxicash: event stream lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
