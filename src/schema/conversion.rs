//! Conversion between domain records and storage documents
//!
//! The storage schema is an explicit contract: every field written to or
//! read from a document is named here, nothing is inferred from struct
//! shape. These functions are pure and never touch storage.
//!
//! Callers pass the lower-cased exchange code and symbol they used to
//! derive the partition key; decoding restores the canonical exchange.

use bson::{doc, Document};
use thiserror::Error;

use crate::schema::{BarData, Exchange, Interval, TickData};

/// A stored value could not be decoded back into a domain record.
///
/// Indicates drift between storage contents and the domain model; it is
/// surfaced to the caller, never recovered from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unrecognized interval code '{0}'")]
    UnknownInterval(String),

    #[error("unrecognized exchange code '{0}'")]
    UnknownExchange(String),

    #[error("missing or mistyped document field '{0}'")]
    Field(&'static str),
}

fn get_f64(doc: &Document, field: &'static str) -> Result<f64, DecodeError> {
    doc.get_f64(field).map_err(|_| DecodeError::Field(field))
}

fn get_datetime(
    doc: &Document,
    field: &'static str,
) -> Result<chrono::DateTime<chrono::Utc>, DecodeError> {
    doc.get_datetime(field)
        .map(|dt| dt.to_chrono())
        .map_err(|_| DecodeError::Field(field))
}

fn get_str<'a>(doc: &'a Document, field: &'static str) -> Result<&'a str, DecodeError> {
    doc.get_str(field).map_err(|_| DecodeError::Field(field))
}

/// Encode a bar into its storage document.
pub fn bar_to_document(exchange: &str, symbol: &str, bar: &BarData) -> Document {
    doc! {
        "datetime": bson::DateTime::from_chrono(bar.datetime),
        "open": bar.open_price,
        "close": bar.close_price,
        "high": bar.high_price,
        "low": bar.low_price,
        "volume": bar.volume,
        "open_interest": bar.open_interest,
        "period": bar.interval.as_str(),
        "symbol": symbol,
        "ex": exchange,
    }
}

/// Decode a stored bar document.
pub fn document_to_bar(
    exchange: &str,
    symbol: &str,
    doc: &Document,
) -> Result<BarData, DecodeError> {
    let exchange = Exchange::from_code(exchange)
        .ok_or_else(|| DecodeError::UnknownExchange(exchange.to_string()))?;
    let period = get_str(doc, "period")?;
    let interval =
        Interval::from_code(period).ok_or_else(|| DecodeError::UnknownInterval(period.to_string()))?;

    Ok(BarData {
        symbol: symbol.to_string(),
        exchange,
        interval,
        datetime: get_datetime(doc, "datetime")?,
        volume: get_f64(doc, "volume")?,
        open_interest: get_f64(doc, "open_interest")?,
        open_price: get_f64(doc, "open")?,
        high_price: get_f64(doc, "high")?,
        low_price: get_f64(doc, "low")?,
        close_price: get_f64(doc, "close")?,
    })
}

/// Encode a tick into its storage document.
///
/// Top-of-book fields are copied unconditionally. Depth levels 2-5 are
/// written only when the tick actually carries depth, so partitions never
/// hold meaningless zero ladders.
pub fn tick_to_document(exchange: &str, symbol: &str, tick: &TickData) -> Document {
    let mut doc = doc! {
        "datetime": bson::DateTime::from_chrono(tick.datetime),
        "name": tick.name.as_str(),
        "volume": tick.volume,
        "open_interest": tick.open_interest,
        "last_price": tick.last_price,
        "last_volume": tick.last_volume,
        "limit_up": tick.limit_up,
        "limit_down": tick.limit_down,
        "open": tick.open_price,
        "high": tick.high_price,
        "low": tick.low_price,
        "pre_close": tick.pre_close,
        "bid_price_1": tick.bid_price_1,
        "ask_price_1": tick.ask_price_1,
        "bid_volume_1": tick.bid_volume_1,
        "ask_volume_1": tick.ask_volume_1,
        "symbol": symbol,
        "ex": exchange,
    };

    if tick.has_depth() {
        doc.insert("bid_price_2", tick.bid_price_2);
        doc.insert("bid_price_3", tick.bid_price_3);
        doc.insert("bid_price_4", tick.bid_price_4);
        doc.insert("bid_price_5", tick.bid_price_5);

        doc.insert("ask_price_2", tick.ask_price_2);
        doc.insert("ask_price_3", tick.ask_price_3);
        doc.insert("ask_price_4", tick.ask_price_4);
        doc.insert("ask_price_5", tick.ask_price_5);

        doc.insert("bid_volume_2", tick.bid_volume_2);
        doc.insert("bid_volume_3", tick.bid_volume_3);
        doc.insert("bid_volume_4", tick.bid_volume_4);
        doc.insert("bid_volume_5", tick.bid_volume_5);

        doc.insert("ask_volume_2", tick.ask_volume_2);
        doc.insert("ask_volume_3", tick.ask_volume_3);
        doc.insert("ask_volume_4", tick.ask_volume_4);
        doc.insert("ask_volume_5", tick.ask_volume_5);
    }

    doc
}

/// Decode a stored tick document.
///
/// Depth levels 2-5 are populated only when the document has a level-2 bid
/// price; otherwise they stay at their zeroed defaults.
pub fn document_to_tick(
    exchange: &str,
    symbol: &str,
    doc: &Document,
) -> Result<TickData, DecodeError> {
    let exchange = Exchange::from_code(exchange)
        .ok_or_else(|| DecodeError::UnknownExchange(exchange.to_string()))?;

    let mut tick = TickData::new(symbol, exchange, get_datetime(doc, "datetime")?);
    tick.name = get_str(doc, "name")?.to_string();
    tick.volume = get_f64(doc, "volume")?;
    tick.open_interest = get_f64(doc, "open_interest")?;
    tick.last_price = get_f64(doc, "last_price")?;
    tick.last_volume = get_f64(doc, "last_volume")?;
    tick.limit_up = get_f64(doc, "limit_up")?;
    tick.limit_down = get_f64(doc, "limit_down")?;
    tick.open_price = get_f64(doc, "open")?;
    tick.high_price = get_f64(doc, "high")?;
    tick.low_price = get_f64(doc, "low")?;
    tick.pre_close = get_f64(doc, "pre_close")?;
    tick.bid_price_1 = get_f64(doc, "bid_price_1")?;
    tick.ask_price_1 = get_f64(doc, "ask_price_1")?;
    tick.bid_volume_1 = get_f64(doc, "bid_volume_1")?;
    tick.ask_volume_1 = get_f64(doc, "ask_volume_1")?;

    if doc.get_f64("bid_price_2").is_ok() {
        tick.bid_price_2 = get_f64(doc, "bid_price_2")?;
        tick.bid_price_3 = get_f64(doc, "bid_price_3")?;
        tick.bid_price_4 = get_f64(doc, "bid_price_4")?;
        tick.bid_price_5 = get_f64(doc, "bid_price_5")?;

        tick.ask_price_2 = get_f64(doc, "ask_price_2")?;
        tick.ask_price_3 = get_f64(doc, "ask_price_3")?;
        tick.ask_price_4 = get_f64(doc, "ask_price_4")?;
        tick.ask_price_5 = get_f64(doc, "ask_price_5")?;

        tick.bid_volume_2 = get_f64(doc, "bid_volume_2")?;
        tick.bid_volume_3 = get_f64(doc, "bid_volume_3")?;
        tick.bid_volume_4 = get_f64(doc, "bid_volume_4")?;
        tick.bid_volume_5 = get_f64(doc, "bid_volume_5")?;

        tick.ask_volume_2 = get_f64(doc, "ask_volume_2")?;
        tick.ask_volume_3 = get_f64(doc, "ask_volume_3")?;
        tick.ask_volume_4 = get_f64(doc, "ask_volume_4")?;
        tick.ask_volume_5 = get_f64(doc, "ask_volume_5")?;
    }

    Ok(tick)
}
