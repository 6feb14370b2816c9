//! # Market Store
//!
//! Persistence layer for time-series market data (price bars and quote
//! ticks) backed by a schemaless document database.
//!
//! ## Features
//!
//! - **Entity mapping**: explicit, lossless conversion between domain
//!   records and storage documents
//! - **Partitioned storage**: one collection per (kind, exchange, symbol),
//!   derived deterministically, never stored
//! - **Replace-range writes**: a saved batch is authoritative for its time
//!   span; overlapping rows are replaced, not duplicated
//! - **Idempotent tick upserts**: re-saving a snapshot updates it in place
//!
//! ## Architecture
//!
//! The `schema` module holds the domain types and the document mapper; the
//! `storage` module owns the database manager and the document-store
//! contract with its MongoDB and in-memory implementations. Reads flow
//! storage -> document -> mapper -> domain record; writes flow the other
//! way. One manager instance owns the connection for the process lifetime.

pub mod cli;
pub mod config;
pub mod schema;
pub mod storage;

// Re-export commonly used types
pub use config::{DatabaseSettings, Settings};
pub use schema::{BarData, DecodeError, Exchange, Interval, TickData};
pub use storage::{
    BarStatistics, DocumentStore, MarketDataManager, MemoryStore, MongoStore, SortDirection,
    StoreError, StoreResult, TimeBound,
};
