//! Command-line interface
//!
//! Provides maintenance commands for the market data store.

pub mod db;

use clap::{Parser, Subcommand};

/// Market Store CLI
#[derive(Parser)]
#[command(name = "market-store")]
#[command(about = "Persistence layer for time-series market data")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Database operations
    #[command(subcommand)]
    Db(db::DbCommands),
}
