//! Domain types and the entity mapper
//!
//! `market_data` holds the canonical in-memory records; `conversion` is the
//! explicit document encode/decode contract used by the storage layer.

pub mod conversion;
pub mod market_data;

pub use conversion::{
    bar_to_document, document_to_bar, document_to_tick, tick_to_document, DecodeError,
};
pub use market_data::{BarData, Exchange, Interval, TickData};
