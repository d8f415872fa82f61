//! xconnect — reconcile balances between an exchange and a bookkeeping
//! ledger, and transfer funds between exchange sub-accounts with the
//! movement mirrored as a ledger transaction.
//!
//! Exit codes:
//! - `reconcile`: 0 all balances agree, 1 mismatches found, 2 failure.
//! - `transfer`: 0 success, 2 failure.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use xc_config::Config;
use xc_exchange::ExchangeClient;
use xc_ledger::LedgerClient;
use xc_transfer::{TransferOrchestrator, TransferRequest};

#[derive(Parser)]
#[command(name = "xconnect")]
#[command(about = "Cross-ledger balance reconciliation and transfers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare every exchange balance against the ledger and list mismatches
    Reconcile {
        /// Path to the xconnect YAML config file
        #[arg(long)]
        config: String,

        /// Emit mismatches as a JSON array instead of text lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Move funds between exchange sub-accounts and journal the movement
    Transfer {
        /// Path to the xconnect YAML config file
        #[arg(long)]
        config: String,

        /// Which currency to transfer (e.g. BTC)
        #[arg(long)]
        currency: String,

        /// How much to transfer, as a decimal string (e.g. 1.25)
        #[arg(long)]
        quan: String,

        /// Source: "1" (spot) or "6" (funding)
        #[arg(long)]
        from: String,

        /// Destination: "1" (spot) or "6" (funding)
        #[arg(long)]
        to: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Build both clients from one config file. The credentials file referenced
/// by the config is loaded here, once.
fn connect(config_path: &str) -> Result<(Config, ExchangeClient, LedgerClient)> {
    let cfg = xc_config::load_config_file(config_path)?;
    let credentials = xc_config::load_credentials_file(&cfg.exchange.credentials)?;
    let exchange = ExchangeClient::new(&cfg.exchange, credentials)
        .context("failed to build exchange client")?;
    let ledger = LedgerClient::new(&cfg.ledger).context("failed to build ledger client")?;
    Ok((cfg, exchange, ledger))
}

async fn reconcile(config_path: &str, json: bool) -> Result<ExitCode> {
    let (cfg, exchange, ledger) = connect(config_path)?;

    let mismatches = xc_reconcile::run(&cfg, &exchange, &ledger)
        .await
        .context("reconciliation aborted")?;

    if mismatches.is_empty() {
        if json {
            println!("[]");
        } else {
            println!("All relevant balances agree with each other.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&mismatches)?);
    } else {
        for comparison in &mismatches {
            println!("{comparison}");
        }
        println!("{} balance mismatch(es) found.", mismatches.len());
    }
    Ok(ExitCode::FAILURE)
}

async fn transfer(
    config_path: &str,
    currency: &str,
    quan: &str,
    from: &str,
    to: &str,
) -> Result<ExitCode> {
    // Validation happens before connect() could ever issue a request.
    let request = TransferRequest::new(currency, from, to, quan)?;

    let (cfg, exchange, ledger) = connect(config_path)?;
    let orchestrator = TransferOrchestrator::new(&exchange, &ledger, &ledger, &cfg.ledger);

    let receipt = orchestrator.run(&request).await?;

    println!(
        "Transferred {} {} from {} to {}.",
        request.quantity, request.currency, request.from, request.to
    );
    println!(
        "exchange transfer id={} ledger transaction id={} (debit {} -> account {}, credit {} -> account {})",
        receipt.exchange_transfer_id,
        receipt.transaction_id,
        request.quantity,
        receipt.dest_account,
        -request.quantity,
        receipt.source_account,
    );
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.cmd {
        Commands::Reconcile { config, json } => reconcile(&config, json).await,
        Commands::Transfer {
            config,
            currency,
            quan,
            from,
            to,
        } => transfer(&config, &currency, &quan, &from, &to).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("xconnect: {err:#}");
            ExitCode::from(2)
        }
    }
}
