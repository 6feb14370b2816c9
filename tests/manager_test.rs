//! Manager-level persistence scenarios over the in-memory store

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use market_store::{BarData, Exchange, Interval, MarketDataManager, StoreError, TickData};

fn minute(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, hour, min, 0).unwrap()
}

fn bar(
    symbol: &str,
    exchange: Exchange,
    interval: Interval,
    datetime: DateTime<Utc>,
    close: f64,
) -> BarData {
    BarData {
        symbol: symbol.to_string(),
        exchange,
        interval,
        datetime,
        volume: 1_000.0,
        open_interest: 0.0,
        open_price: close - 0.5,
        high_price: close + 0.25,
        low_price: close - 0.75,
        close_price: close,
    }
}

fn tick(symbol: &str, exchange: Exchange, datetime: DateTime<Utc>, last_price: f64) -> TickData {
    let mut tick = TickData::new(symbol, exchange, datetime);
    tick.name = symbol.to_string();
    tick.last_price = last_price;
    tick.bid_price_1 = last_price - 0.01;
    tick.ask_price_1 = last_price + 0.01;
    tick.bid_volume_1 = 10.0;
    tick.ask_volume_1 = 10.0;
    tick
}

#[tokio::test]
async fn test_load_bar_range_is_inclusive_and_ordered() {
    let manager = MarketDataManager::in_memory();
    let bars = vec![
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 32), 3.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 1.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 31), 2.0),
    ];
    manager.save_bar_data(&bars).await.unwrap();

    let loaded = manager
        .load_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), minute(9, 31))
        .await
        .unwrap();

    let times: Vec<DateTime<Utc>> = loaded.iter().map(|b| b.datetime).collect();
    assert_eq!(times, vec![minute(9, 30), minute(9, 31)]);
    // Canonical exchange code restored, partition key does not leak out.
    assert!(loaded.iter().all(|b| b.exchange == Exchange::Nasdaq));
}

#[tokio::test]
async fn test_load_bar_accepts_date_bounds_as_midnight() {
    let manager = MarketDataManager::in_memory();
    let bars = vec![
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 1.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 31), 2.0),
    ];
    manager.save_bar_data(&bars).await.unwrap();

    let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let loaded = manager
        .load_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute, start, minute(9, 30))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].datetime, minute(9, 30));
}

#[tokio::test]
async fn test_load_missing_partition_is_empty() {
    let manager = MarketDataManager::in_memory();
    let loaded = manager
        .load_bar_data("GHOST", Exchange::Nyse, Interval::Daily, minute(0, 0), minute(23, 0))
        .await
        .unwrap();
    assert!(loaded.is_empty());

    let ticks = manager
        .load_tick_data("GHOST", Exchange::Nyse, minute(0, 0), minute(23, 0))
        .await
        .unwrap();
    assert!(ticks.is_empty());
}

#[tokio::test]
async fn test_save_replaces_overlapping_range_including_bounds() {
    let manager = MarketDataManager::in_memory();
    let first = vec![
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 1.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 31), 2.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 32), 3.0),
    ];
    manager.save_bar_data(&first).await.unwrap();

    // Re-save the same span with new prices; boundary rows must be
    // replaced too, not duplicated.
    let second = vec![
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 10.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 32), 30.0),
    ];
    manager.save_bar_data(&second).await.unwrap();

    let loaded = manager
        .load_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 0), minute(10, 0))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].close_price, 10.0);
    assert_eq!(loaded[1].close_price, 30.0);
}

#[tokio::test]
async fn test_save_leaves_other_intervals_untouched() {
    let manager = MarketDataManager::in_memory();
    let hourly = vec![bar("AAPL", Exchange::Nasdaq, Interval::Hour, minute(9, 30), 5.0)];
    manager.save_bar_data(&hourly).await.unwrap();

    let minutes = vec![
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 0), 1.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(10, 0), 2.0),
    ];
    manager.save_bar_data(&minutes).await.unwrap();

    let loaded = manager
        .load_bar_data("AAPL", Exchange::Nasdaq, Interval::Hour, minute(0, 0), minute(23, 0))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].close_price, 5.0);
}

#[tokio::test]
async fn test_save_empty_batch_is_noop() {
    let manager = MarketDataManager::in_memory();
    manager.save_bar_data(&[]).await.unwrap();
    manager.save_tick_data(&[]).await.unwrap();
    manager.upsert_tick_data(&[]).await.unwrap();
}

#[tokio::test]
async fn test_newest_oldest_scenario() {
    let manager = MarketDataManager::in_memory();
    let bars = vec![
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 1.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 31), 2.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 32), 3.0),
    ];
    manager.save_bar_data(&bars).await.unwrap();

    let oldest = manager
        .get_oldest_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(oldest.datetime, minute(9, 30));

    let newest = manager
        .get_newest_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(newest.datetime, minute(9, 32));

    let loaded = manager
        .load_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), minute(9, 31))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);

    // Absent results are a normal outcome, not an error.
    let none = manager
        .get_newest_bar_data("AAPL", Exchange::Nasdaq, Interval::Daily)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_partition_isolation() {
    let manager = MarketDataManager::in_memory();
    let abc = vec![bar("ABC", Exchange::Nyse, Interval::Minute, minute(9, 30), 1.0)];
    let xyz = vec![bar("XYZ", Exchange::Nyse, Interval::Minute, minute(9, 30), 2.0)];
    manager.save_bar_data(&abc).await.unwrap();
    manager.save_bar_data(&xyz).await.unwrap();

    let loaded = manager
        .load_bar_data("XYZ", Exchange::Nyse, Interval::Minute, minute(9, 0), minute(10, 0))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].symbol, "xyz");
    assert_eq!(loaded[0].close_price, 2.0);

    manager.delete_bar_data("ABC", Exchange::Nyse, Interval::Minute).await.unwrap();
    let survivors = manager
        .load_bar_data("XYZ", Exchange::Nyse, Interval::Minute, minute(9, 0), minute(10, 0))
        .await
        .unwrap();
    assert_eq!(survivors.len(), 1);
}

#[tokio::test]
async fn test_symbol_case_folding() {
    let manager = MarketDataManager::in_memory();
    let bars = vec![bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 1.0)];
    manager.save_bar_data(&bars).await.unwrap();

    let loaded = manager
        .load_bar_data("aapl", Exchange::Nasdaq, Interval::Minute, minute(9, 0), minute(10, 0))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
}

#[tokio::test]
async fn test_delete_then_load_is_empty() {
    let manager = MarketDataManager::in_memory();
    let bars = vec![
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 1.0),
        bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 31), 2.0),
    ];
    manager.save_bar_data(&bars).await.unwrap();

    let count = manager
        .delete_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute)
        .await
        .unwrap();
    assert_eq!(count, 2);

    let loaded = manager
        .load_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 0), minute(10, 0))
        .await
        .unwrap();
    assert!(loaded.is_empty());

    // Deleting an already-missing partition reports zero rows.
    let count = manager
        .delete_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_bar_statistics_count_per_partition() {
    let manager = MarketDataManager::in_memory();
    manager
        .save_bar_data(&[
            bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 1.0),
            bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 31), 2.0),
        ])
        .await
        .unwrap();
    manager
        .save_bar_data(&[bar("AAPL", Exchange::Nasdaq, Interval::Daily, minute(0, 0), 3.0)])
        .await
        .unwrap();
    manager
        .save_bar_data(&[
            bar("rb2405", Exchange::Shfe, Interval::Minute, minute(9, 30), 4.0),
            bar("rb2405", Exchange::Shfe, Interval::Minute, minute(9, 31), 5.0),
            bar("rb2405", Exchange::Shfe, Interval::Minute, minute(9, 32), 6.0),
        ])
        .await
        .unwrap();

    let mut stats = manager.get_bar_data_statistics().await.unwrap();
    stats.sort_by(|a, b| {
        (a.symbol.clone(), a.interval.as_str()).cmp(&(b.symbol.clone(), b.interval.as_str()))
    });

    assert_eq!(stats.len(), 3);

    assert_eq!(stats[0].symbol, "aapl");
    assert_eq!(stats[0].exchange, Exchange::Nasdaq);
    assert_eq!(stats[0].interval, Interval::Minute);
    assert_eq!(stats[0].count, 2);

    assert_eq!(stats[1].symbol, "aapl");
    assert_eq!(stats[1].interval, Interval::Daily);
    assert_eq!(stats[1].count, 1);

    assert_eq!(stats[2].symbol, "rb2405");
    assert_eq!(stats[2].exchange, Exchange::Shfe);
    assert_eq!(stats[2].count, 3);
}

#[tokio::test]
async fn test_tick_save_load_and_newest() {
    let manager = MarketDataManager::in_memory();
    let ticks = vec![
        tick("rb2405", Exchange::Shfe, minute(9, 30), 3_900.0),
        tick("rb2405", Exchange::Shfe, minute(9, 31), 3_901.0),
    ];
    manager.save_tick_data(&ticks).await.unwrap();

    let loaded = manager
        .load_tick_data("rb2405", Exchange::Shfe, minute(9, 0), minute(10, 0))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].last_price, 3_900.0);
    assert_eq!(loaded[1].last_price, 3_901.0);

    let newest = manager
        .get_newest_tick_data("rb2405", Exchange::Shfe)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(newest.datetime, minute(9, 31));

    let none = manager
        .get_newest_tick_data("ghost", Exchange::Shfe)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_tick_upsert_is_idempotent() {
    let manager = MarketDataManager::in_memory();
    let snapshot = tick("rb2405", Exchange::Shfe, minute(9, 30), 3_900.0);
    manager.upsert_tick_data(&[snapshot.clone()]).await.unwrap();

    let mut updated = snapshot;
    updated.last_price = 3_905.0;
    manager.upsert_tick_data(&[updated]).await.unwrap();

    let loaded = manager
        .load_tick_data("rb2405", Exchange::Shfe, minute(9, 0), minute(10, 0))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].last_price, 3_905.0);
}

#[tokio::test]
async fn test_clean_drops_all_kinds_across_exchanges() {
    let manager = MarketDataManager::in_memory();
    manager
        .save_bar_data(&[bar("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 1.0)])
        .await
        .unwrap();
    manager
        .save_bar_data(&[bar("AAPL", Exchange::Smart, Interval::Minute, minute(9, 30), 1.0)])
        .await
        .unwrap();
    manager
        .save_tick_data(&[tick("AAPL", Exchange::Nasdaq, minute(9, 30), 180.0)])
        .await
        .unwrap();
    manager
        .save_bar_data(&[bar("MSFT", Exchange::Nasdaq, Interval::Minute, minute(9, 30), 2.0)])
        .await
        .unwrap();

    manager.clean("aapl").await.unwrap();

    assert!(manager
        .load_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 0), minute(10, 0))
        .await
        .unwrap()
        .is_empty());
    assert!(manager
        .load_bar_data("AAPL", Exchange::Smart, Interval::Minute, minute(9, 0), minute(10, 0))
        .await
        .unwrap()
        .is_empty());
    assert!(manager
        .load_tick_data("AAPL", Exchange::Nasdaq, minute(9, 0), minute(10, 0))
        .await
        .unwrap()
        .is_empty());

    // Other symbols are untouched.
    let msft = manager
        .load_bar_data("MSFT", Exchange::Nasdaq, Interval::Minute, minute(9, 0), minute(10, 0))
        .await
        .unwrap();
    assert_eq!(msft.len(), 1);
}

#[tokio::test]
async fn test_close_is_idempotent_and_final() {
    let manager = MarketDataManager::in_memory();
    assert!(!manager.is_closed());

    manager.close();
    manager.close();
    assert!(manager.is_closed());

    let err = manager
        .load_bar_data("AAPL", Exchange::Nasdaq, Interval::Minute, minute(9, 0), minute(10, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Closed));

    let err = manager.save_bar_data(&[]).await.unwrap_err();
    assert!(matches!(err, StoreError::Closed));
}
