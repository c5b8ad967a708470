//! Wallet ledger service binary
//!
//! Opens the store, seeds demo wallets on first start and stays up until
//! Ctrl-C. Configuration comes from the TOML file named by
//! `WALLET_LEDGER_CONFIG`, otherwise from `WALLET_LEDGER_*` variables.

use anyhow::Context;
use prometheus::{Encoder, TextEncoder};
use wallet_ledger::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting wallet ledger");

    // Load configuration
    let config = match std::env::var("WALLET_LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env().context("reading WALLET_LEDGER_* environment")?,
    };

    let ledger = Ledger::open(config).context("opening ledger")?;

    let seeded = ledger.seed_if_empty().context("seeding wallets")?;
    if !seeded.is_empty() {
        tracing::info!(
            wallets = %serde_json::to_string(&seeded)?,
            "Seeded demo wallets"
        );
    }

    let stats = ledger.stats()?;
    tracing::info!(
        wallets = stats.total_wallets,
        transactions = stats.total_transactions,
        "Ledger ready"
    );

    tokio::signal::ctrl_c().await?;

    let mut exposition = Vec::new();
    TextEncoder::new()
        .encode(&ledger.metrics().registry().gather(), &mut exposition)
        .context("encoding metrics")?;
    tracing::info!(metrics = %String::from_utf8_lossy(&exposition), "Final metrics");

    tracing::info!("Shutting down wallet ledger");
    ledger.shutdown()?;
    Ok(())
}
