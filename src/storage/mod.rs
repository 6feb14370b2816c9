//! Storage layer
//!
//! `store` defines the document-database contract, `mongo` and `memory`
//! implement it, and `manager` composes the entity mapper with store
//! operations into the persistence API.

pub mod manager;
pub mod memory;
pub mod mongo;
pub mod store;

pub use manager::{BarStatistics, MarketDataManager, TimeBound};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{DocumentStore, SortDirection, StoreError, StoreResult};
