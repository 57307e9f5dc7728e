//! Wallet service binary

use std::error::Error;
use std::sync::Arc;
use wallet_core::{Config, Wallet};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Chipvault Wallet Server");

    // Load configuration
    let config = match std::env::var("WALLET_CONFIG") {
        Ok(path) => Config::from_file(path)?,
        Err(_) => Config::from_env()?,
    };

    // Payment provider credentials come from the environment
    let pay_url =
        std::env::var("PAY_API_URL").unwrap_or_else(|_| "https://pay.crypt.bot".to_string());
    let pay_token = std::env::var("PAY_API_TOKEN")?;
    let client = provider::CryptoPayClient::new(pay_url, pay_token)
        .with_invoice_asset(config.asset.clone());

    // Open wallet
    let wallet = Arc::new(Wallet::open(config, Arc::new(client)).await?);
    tracing::info!("Wallet opened successfully");

    // Start the orphaned-withdrawal sweeper
    wallet.sweeper().spawn();

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down wallet server");
    wallet.shutdown().await?;
    Ok(())
}
