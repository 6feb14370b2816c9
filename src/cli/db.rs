//! Database maintenance commands

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::schema::{Exchange, Interval};
use crate::storage::MarketDataManager;

/// Database subcommands
#[derive(Subcommand)]
pub enum DbCommands {
    /// Show per-dataset bar row counts across the whole database
    Stats(StatsArgs),
    /// Drop the bar partition for one symbol/exchange
    Delete(DeleteArgs),
    /// Drop every bar and tick partition for a symbol
    Clean(CleanArgs),
}

/// Arguments for the stats command
#[derive(Args)]
pub struct StatsArgs {
    /// Emit statistics as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the delete command
#[derive(Args)]
pub struct DeleteArgs {
    /// Instrument symbol
    #[arg(long)]
    pub symbol: String,

    /// Venue code (e.g. NASDAQ, SHFE)
    #[arg(long)]
    pub exchange: String,

    /// Period code (1m, 1h, d, w)
    #[arg(long)]
    pub interval: String,
}

/// Arguments for the clean command
#[derive(Args)]
pub struct CleanArgs {
    /// Instrument symbol, matched across all exchanges
    #[arg(long)]
    pub symbol: String,
}

/// Execute database commands
pub async fn execute(cmd: DbCommands) -> Result<()> {
    match cmd {
        DbCommands::Stats(args) => execute_stats(args).await,
        DbCommands::Delete(args) => execute_delete(args).await,
        DbCommands::Clean(args) => execute_clean(args).await,
    }
}

async fn connect() -> Result<MarketDataManager> {
    let settings = Settings::load()?;
    Ok(MarketDataManager::connect(&settings.database).await?)
}

fn parse_exchange(code: &str) -> Result<Exchange> {
    Exchange::from_code(code).ok_or_else(|| anyhow!("unrecognized exchange code '{}'", code))
}

fn parse_interval(code: &str) -> Result<Interval> {
    Interval::from_code(code).ok_or_else(|| anyhow!("unrecognized interval code '{}'", code))
}

async fn execute_stats(args: StatsArgs) -> Result<()> {
    let manager = connect().await?;

    info!("Fetching bar data statistics...");
    let stats = manager.get_bar_data_statistics().await?;
    manager.close();

    if args.json {
        let rows: Vec<serde_json::Value> = stats
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "symbol": entry.symbol,
                    "exchange": entry.exchange.as_str(),
                    "interval": entry.interval.as_str(),
                    "count": entry.count,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if stats.is_empty() {
        println!("No bar data stored.");
        return Ok(());
    }

    println!("Bar data statistics:");
    for entry in &stats {
        println!(
            "  {}@{} [{}]: {} rows",
            entry.symbol, entry.exchange, entry.interval, entry.count
        );
    }
    Ok(())
}

async fn execute_delete(args: DeleteArgs) -> Result<()> {
    let exchange = parse_exchange(&args.exchange)?;
    let interval = parse_interval(&args.interval)?;

    let manager = connect().await?;
    let count = manager
        .delete_bar_data(&args.symbol, exchange, interval)
        .await?;
    manager.close();

    info!("Deleted bar partition for {}@{}", args.symbol, exchange);
    println!("Dropped ~{} rows for {}@{}", count, args.symbol, exchange);
    Ok(())
}

async fn execute_clean(args: CleanArgs) -> Result<()> {
    let manager = connect().await?;
    manager.clean(&args.symbol).await?;
    manager.close();

    info!("Cleaned all partitions for symbol {}", args.symbol);
    println!("Dropped all bar and tick partitions for {}", args.symbol);
    Ok(())
}
