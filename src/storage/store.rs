//! Document store contract
//!
//! The persistence layer treats the document database as an external
//! service with a fixed operation surface. `MongoStore` is the production
//! implementation; `MemoryStore` implements the same contract in-process
//! for tests.

use async_trait::async_trait;
use bson::{Bson, Document};
use thiserror::Error;

use crate::schema::DecodeError;

/// Storage errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("store is closed")]
    Closed,

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Sort direction for a single-field sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Numeric direction as the wire protocol encodes it
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Operations the persistence layer consumes from the document database.
///
/// Filters are `bson::Document`s using implicit equality plus the
/// `$gt`/`$gte`/`$lt`/`$lte` range operators - the subset the manager
/// emits. Collections spring into existence on first insert; reads and
/// deletes against a collection that does not exist succeed with empty
/// results.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Filtered find with optional single-field sort and limit.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<(&str, SortDirection)>,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Document>>;

    /// Bulk insert. Errors propagate unmodified; no partial-failure recovery.
    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> StoreResult<()>;

    /// Delete every document matching the filter, returning the count.
    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Upsert a single document: set the given fields on the first match,
    /// or insert filter + fields when nothing matches.
    async fn upsert_one(&self, collection: &str, filter: Document, set: Document)
        -> StoreResult<()>;

    /// Exact count of documents matching the filter.
    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Estimated total document count; may be approximate.
    async fn estimated_count(&self, collection: &str) -> StoreResult<u64>;

    /// Names of all collections whose name starts with the prefix.
    async fn list_collections(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Distinct values of a field across the collection.
    async fn distinct(&self, collection: &str, field: &str) -> StoreResult<Vec<Bson>>;

    /// Drop the collection and everything in it.
    async fn drop_collection(&self, collection: &str) -> StoreResult<()>;
}
