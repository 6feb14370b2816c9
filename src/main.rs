//! Market Store CLI
//!
//! Provides commands for:
//! - `db stats`: Show bar row counts per dataset
//! - `db delete`: Drop the bar partition for one symbol/exchange
//! - `db clean`: Drop every partition for a symbol

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_store::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("market_store=info".parse()?))
        .init();

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command
    match cli.command {
        Commands::Db(cmd) => {
            market_store::cli::db::execute(cmd).await?;
        }
    }

    Ok(())
}
