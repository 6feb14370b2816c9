//! Market data manager
//!
//! High-level persistence operations for bar and tick data. The manager is
//! the sole owner of the document store handle: it derives partition names
//! from (kind, exchange, symbol), composes entity-mapper calls with store
//! operations, and is constructed once per process lifetime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bson::{doc, Bson};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use super::memory::MemoryStore;
use super::mongo::MongoStore;
use super::store::{DocumentStore, SortDirection, StoreError, StoreResult};
use crate::config::DatabaseSettings;
use crate::schema::{
    bar_to_document, document_to_bar, document_to_tick, tick_to_document, BarData, DecodeError,
    Exchange, Interval, TickData,
};

const BAR_PREFIX: &str = "kline:";
const TICK_PREFIX: &str = "tick:";

/// A query bound: either an exact timestamp or a calendar date.
///
/// A bare date normalizes to midnight UTC of that date, so date-only
/// bounds behave as inclusive whole-day boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl TimeBound {
    /// Resolve the bound to a concrete timestamp
    pub fn as_datetime(&self) -> DateTime<Utc> {
        match self {
            TimeBound::DateTime(dt) => *dt,
            TimeBound::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(dt: DateTime<Utc>) -> Self {
        TimeBound::DateTime(dt)
    }
}

impl From<NaiveDate> for TimeBound {
    fn from(date: NaiveDate) -> Self {
        TimeBound::Date(date)
    }
}

/// Row counts for one (symbol, exchange, interval) bar dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarStatistics {
    pub symbol: String,
    pub exchange: Exchange,
    pub interval: Interval,
    pub count: u64,
}

/// Partition name for bar data, from lower-cased exchange code and symbol
fn bar_partition(exchange: &str, symbol: &str) -> String {
    format!("{}{}:{}", BAR_PREFIX, exchange, symbol)
}

/// Partition name for tick data, from lower-cased exchange code and symbol
fn tick_partition(exchange: &str, symbol: &str) -> String {
    format!("{}{}:{}", TICK_PREFIX, exchange, symbol)
}

/// Split a partition name into (kind, exchange, symbol) components
fn split_partition(name: &str) -> Option<(&str, &str, &str)> {
    let mut parts = name.splitn(3, ':');
    Some((parts.next()?, parts.next()?, parts.next()?))
}

/// Market data persistence manager
///
/// Safe for concurrent use; the underlying store is a pooled, thread-safe
/// client. The delete-then-insert pair inside the save operations is not
/// atomic: a concurrent reader may observe the overlapping range partially
/// replaced.
pub struct MarketDataManager {
    store: Arc<dyn DocumentStore>,
    closed: AtomicBool,
}

impl MarketDataManager {
    /// Create a manager over an already-constructed store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            closed: AtomicBool::new(false),
        }
    }

    /// Connect to the configured MongoDB database.
    ///
    /// Connection failures are fatal and propagate immediately; there is
    /// no retry.
    pub async fn connect(settings: &DatabaseSettings) -> StoreResult<Self> {
        let store = MongoStore::connect(settings).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Create a manager over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Close the manager. Idempotent; every operation afterwards fails
    /// with `StoreError::Closed`. Safe to call even if the store never
    /// successfully connected.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("market data manager closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Bar operations
    // ========================================================================

    /// Load bars for one interval within [start, end], ascending by
    /// datetime. Missing partitions yield an empty vector, never an error.
    pub async fn load_bar_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        interval: Interval,
        start: impl Into<TimeBound>,
        end: impl Into<TimeBound>,
    ) -> StoreResult<Vec<BarData>> {
        self.ensure_open()?;
        let ex = exchange.as_str().to_lowercase();
        let symbol = symbol.to_lowercase();
        let collection = bar_partition(&ex, &symbol);

        let filter = doc! {
            "period": interval.as_str(),
            "datetime": {
                "$gte": bson::DateTime::from_chrono(start.into().as_datetime()),
                "$lte": bson::DateTime::from_chrono(end.into().as_datetime()),
            },
        };
        let docs = self
            .store
            .find(
                &collection,
                filter,
                Some(("datetime", SortDirection::Ascending)),
                None,
            )
            .await?;

        docs.iter()
            .map(|doc| document_to_bar(&ex, &symbol, doc).map_err(StoreError::from))
            .collect()
    }

    /// Save a batch of bars for a single (symbol, exchange, interval).
    ///
    /// Replace-range write: rows for the same interval whose datetime
    /// falls inside the batch's [min, max] span are deleted before the
    /// batch is inserted. Bounds are inclusive - the batch is
    /// authoritative for its whole span, boundary timestamps included.
    /// Empty input is a no-op.
    pub async fn save_bar_data(&self, bars: &[BarData]) -> StoreResult<()> {
        self.ensure_open()?;
        let Some(first) = bars.first() else {
            return Ok(());
        };
        let ex = first.exchange.as_str().to_lowercase();
        let symbol = first.symbol.to_lowercase();
        let interval = first.interval;
        let collection = bar_partition(&ex, &symbol);

        let mut min = first.datetime;
        let mut max = first.datetime;
        for bar in bars {
            min = min.min(bar.datetime);
            max = max.max(bar.datetime);
        }

        let deleted = self
            .store
            .delete_many(
                &collection,
                doc! {
                    "period": interval.as_str(),
                    "datetime": {
                        "$gte": bson::DateTime::from_chrono(min),
                        "$lte": bson::DateTime::from_chrono(max),
                    },
                },
            )
            .await?;

        let docs = bars
            .iter()
            .map(|bar| bar_to_document(&ex, &symbol, bar))
            .collect();
        self.store.insert_many(&collection, docs).await?;

        debug!(
            "Saved {} {} bars to {} ({} overlapping rows replaced)",
            bars.len(),
            interval,
            collection,
            deleted
        );
        Ok(())
    }

    /// Most recent bar for one interval, if the partition has any
    pub async fn get_newest_bar_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        interval: Interval,
    ) -> StoreResult<Option<BarData>> {
        self.bar_at_extreme(symbol, exchange, interval, SortDirection::Descending)
            .await
    }

    /// Earliest bar for one interval, if the partition has any
    pub async fn get_oldest_bar_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        interval: Interval,
    ) -> StoreResult<Option<BarData>> {
        self.bar_at_extreme(symbol, exchange, interval, SortDirection::Ascending)
            .await
    }

    async fn bar_at_extreme(
        &self,
        symbol: &str,
        exchange: Exchange,
        interval: Interval,
        direction: SortDirection,
    ) -> StoreResult<Option<BarData>> {
        self.ensure_open()?;
        let ex = exchange.as_str().to_lowercase();
        let symbol = symbol.to_lowercase();
        let collection = bar_partition(&ex, &symbol);

        let docs = self
            .store
            .find(
                &collection,
                doc! { "period": interval.as_str() },
                Some(("datetime", direction)),
                Some(1),
            )
            .await?;
        docs.first()
            .map(|doc| document_to_bar(&ex, &symbol, doc))
            .transpose()
            .map_err(StoreError::from)
    }

    /// Enumerate every bar partition in the database and count the rows
    /// for each distinct interval present in it.
    pub async fn get_bar_data_statistics(&self) -> StoreResult<Vec<BarStatistics>> {
        self.ensure_open()?;
        let mut stats = Vec::new();

        for name in self.store.list_collections(BAR_PREFIX).await? {
            let Some((_, ex, symbol)) = split_partition(&name) else {
                continue;
            };
            let exchange = Exchange::from_code(ex)
                .ok_or_else(|| DecodeError::UnknownExchange(ex.to_string()))?;

            for value in self.store.distinct(&name, "period").await? {
                let period = match value {
                    Bson::String(period) => period,
                    other => return Err(DecodeError::UnknownInterval(other.to_string()).into()),
                };
                let interval = Interval::from_code(&period)
                    .ok_or_else(|| DecodeError::UnknownInterval(period.clone()))?;
                let count = self
                    .store
                    .count(&name, doc! { "period": period.as_str() })
                    .await?;
                stats.push(BarStatistics {
                    symbol: symbol.to_string(),
                    exchange,
                    interval,
                    count,
                });
            }
        }
        Ok(stats)
    }

    /// Drop the whole bar partition for (symbol, exchange), returning its
    /// estimated row count.
    ///
    /// The count is taken before the drop and may be approximate; it is
    /// not a post-condition guarantee.
    pub async fn delete_bar_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        interval: Interval,
    ) -> StoreResult<u64> {
        self.ensure_open()?;
        let ex = exchange.as_str().to_lowercase();
        let symbol = symbol.to_lowercase();
        let collection = bar_partition(&ex, &symbol);

        let count = self.store.estimated_count(&collection).await?;
        self.store.drop_collection(&collection).await?;

        debug!(
            "Dropped partition {} (~{} rows; requested interval {})",
            collection, count, interval
        );
        Ok(count)
    }

    // ========================================================================
    // Tick operations
    // ========================================================================

    /// Load ticks within [start, end], ascending by datetime
    pub async fn load_tick_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        start: impl Into<TimeBound>,
        end: impl Into<TimeBound>,
    ) -> StoreResult<Vec<TickData>> {
        self.ensure_open()?;
        let ex = exchange.as_str().to_lowercase();
        let symbol = symbol.to_lowercase();
        let collection = tick_partition(&ex, &symbol);

        let filter = doc! {
            "datetime": {
                "$gte": bson::DateTime::from_chrono(start.into().as_datetime()),
                "$lte": bson::DateTime::from_chrono(end.into().as_datetime()),
            },
        };
        let docs = self
            .store
            .find(
                &collection,
                filter,
                Some(("datetime", SortDirection::Ascending)),
                None,
            )
            .await?;

        docs.iter()
            .map(|doc| document_to_tick(&ex, &symbol, doc).map_err(StoreError::from))
            .collect()
    }

    /// Save a batch of ticks for a single (symbol, exchange).
    ///
    /// Same inclusive replace-range strategy as bars, keyed only by
    /// datetime. Empty input is a no-op.
    pub async fn save_tick_data(&self, ticks: &[TickData]) -> StoreResult<()> {
        self.ensure_open()?;
        let Some(first) = ticks.first() else {
            return Ok(());
        };
        let ex = first.exchange.as_str().to_lowercase();
        let symbol = first.symbol.to_lowercase();
        let collection = tick_partition(&ex, &symbol);

        let mut min = first.datetime;
        let mut max = first.datetime;
        for tick in ticks {
            min = min.min(tick.datetime);
            max = max.max(tick.datetime);
        }

        let deleted = self
            .store
            .delete_many(
                &collection,
                doc! {
                    "datetime": {
                        "$gte": bson::DateTime::from_chrono(min),
                        "$lte": bson::DateTime::from_chrono(max),
                    },
                },
            )
            .await?;

        let docs = ticks
            .iter()
            .map(|tick| tick_to_document(&ex, &symbol, tick))
            .collect();
        self.store.insert_many(&collection, docs).await?;

        debug!(
            "Saved {} ticks to {} ({} overlapping rows replaced)",
            ticks.len(),
            collection,
            deleted
        );
        Ok(())
    }

    /// Upsert ticks one by one, keyed by datetime.
    ///
    /// The idempotent write path: re-saving the same snapshot updates the
    /// stored fields in place instead of duplicating the row. Empty input
    /// is a no-op.
    pub async fn upsert_tick_data(&self, ticks: &[TickData]) -> StoreResult<()> {
        self.ensure_open()?;
        let Some(first) = ticks.first() else {
            return Ok(());
        };
        let ex = first.exchange.as_str().to_lowercase();
        let symbol = first.symbol.to_lowercase();
        let collection = tick_partition(&ex, &symbol);

        for tick in ticks {
            let filter = doc! { "datetime": bson::DateTime::from_chrono(tick.datetime) };
            self.store
                .upsert_one(&collection, filter, tick_to_document(&ex, &symbol, tick))
                .await?;
        }
        debug!("Upserted {} ticks into {}", ticks.len(), collection);
        Ok(())
    }

    /// Most recent tick, if the partition has any
    pub async fn get_newest_tick_data(
        &self,
        symbol: &str,
        exchange: Exchange,
    ) -> StoreResult<Option<TickData>> {
        self.ensure_open()?;
        let ex = exchange.as_str().to_lowercase();
        let symbol = symbol.to_lowercase();
        let collection = tick_partition(&ex, &symbol);

        let docs = self
            .store
            .find(
                &collection,
                doc! {},
                Some(("datetime", SortDirection::Descending)),
                Some(1),
            )
            .await?;
        docs.first()
            .map(|doc| document_to_tick(&ex, &symbol, doc))
            .transpose()
            .map_err(StoreError::from)
    }

    // ========================================================================
    // Cross-kind cleanup
    // ========================================================================

    /// Drop every bar and tick partition for the symbol, across all
    /// exchanges, matching case-insensitively.
    pub async fn clean(&self, symbol: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let symbol = symbol.to_lowercase();

        for prefix in [BAR_PREFIX, TICK_PREFIX] {
            for name in self.store.list_collections(prefix).await? {
                match split_partition(&name) {
                    Some((_, _, s)) if s == symbol => {
                        self.store.drop_collection(&name).await?;
                        debug!("Dropped partition {}", name);
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_partition_names() {
        assert_eq!(bar_partition("nasdaq", "aapl"), "kline:nasdaq:aapl");
        assert_eq!(tick_partition("shfe", "rb2405"), "tick:shfe:rb2405");
        assert_eq!(
            split_partition("kline:nasdaq:aapl"),
            Some(("kline", "nasdaq", "aapl"))
        );
        assert_eq!(split_partition("kline:broken"), None);
    }

    #[test]
    fn test_time_bound_date_normalizes_to_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let bound: TimeBound = date.into();
        let dt = bound.as_datetime();
        assert_eq!(dt.to_rfc3339(), "2024-03-04T00:00:00+00:00");

        let exact = chrono::Utc
            .with_ymd_and_hms(2024, 3, 4, 9, 30, 0)
            .unwrap();
        let bound: TimeBound = exact.into();
        assert_eq!(bound.as_datetime(), exact);
    }
}
