//! Domain market data types
//!
//! These types represent the canonical in-memory format for bar and tick
//! data throughout the system. Storage documents are produced from and
//! decoded back into these types by the conversion module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trading venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Exchange {
    // China futures/commodities
    Cffex,
    Shfe,
    Czce,
    Dce,
    Ine,
    Sge,
    // China equities
    Sse,
    Szse,
    // US derivatives
    Cme,
    Cbot,
    Nymex,
    Comex,
    // US equities
    Nyse,
    Nasdaq,
    Smart,
    // HK
    Sehk,
    // Crypto
    Binance,
    Huobi,
    Okex,
    Bitmex,
}

impl Exchange {
    /// Canonical upper-case venue code as stored upstream
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Cffex => "CFFEX",
            Exchange::Shfe => "SHFE",
            Exchange::Czce => "CZCE",
            Exchange::Dce => "DCE",
            Exchange::Ine => "INE",
            Exchange::Sge => "SGE",
            Exchange::Sse => "SSE",
            Exchange::Szse => "SZSE",
            Exchange::Cme => "CME",
            Exchange::Cbot => "CBOT",
            Exchange::Nymex => "NYMEX",
            Exchange::Comex => "COMEX",
            Exchange::Nyse => "NYSE",
            Exchange::Nasdaq => "NASDAQ",
            Exchange::Smart => "SMART",
            Exchange::Sehk => "SEHK",
            Exchange::Binance => "BINANCE",
            Exchange::Huobi => "HUOBI",
            Exchange::Okex => "OKEX",
            Exchange::Bitmex => "BITMEX",
        }
    }

    /// Parse a venue code, case-insensitively
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "CFFEX" => Some(Exchange::Cffex),
            "SHFE" => Some(Exchange::Shfe),
            "CZCE" => Some(Exchange::Czce),
            "DCE" => Some(Exchange::Dce),
            "INE" => Some(Exchange::Ine),
            "SGE" => Some(Exchange::Sge),
            "SSE" => Some(Exchange::Sse),
            "SZSE" => Some(Exchange::Szse),
            "CME" => Some(Exchange::Cme),
            "CBOT" => Some(Exchange::Cbot),
            "NYMEX" => Some(Exchange::Nymex),
            "COMEX" => Some(Exchange::Comex),
            "NYSE" => Some(Exchange::Nyse),
            "NASDAQ" => Some(Exchange::Nasdaq),
            "SMART" => Some(Exchange::Smart),
            "SEHK" => Some(Exchange::Sehk),
            "BINANCE" => Some(Exchange::Binance),
            "HUOBI" => Some(Exchange::Huobi),
            "OKEX" => Some(Exchange::Okex),
            "BITMEX" => Some(Exchange::Bitmex),
            _ => None,
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bar aggregation period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Minute,
    #[serde(rename = "1h")]
    Hour,
    #[serde(rename = "d")]
    Daily,
    #[serde(rename = "w")]
    Weekly,
}

impl Interval {
    /// Canonical period code stored in bar documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute => "1m",
            Interval::Hour => "1h",
            Interval::Daily => "d",
            Interval::Weekly => "w",
        }
    }

    /// Parse a period code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1m" => Some(Interval::Minute),
            "1h" => Some(Interval::Hour),
            "d" => Some(Interval::Daily),
            "w" => Some(Interval::Weekly),
            _ => None,
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregated price interval for one instrument
///
/// `datetime` marks the start of the interval. The tuple
/// (symbol, exchange, interval, datetime) is unique within storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarData {
    pub symbol: String,
    pub exchange: Exchange,
    pub interval: Interval,
    /// Interval start timestamp
    pub datetime: DateTime<Utc>,
    pub volume: f64,
    pub open_interest: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
}

impl BarData {
    /// Get the full instrument identifier (symbol@exchange)
    pub fn full_symbol(&self) -> String {
        format!("{}@{}", self.symbol, self.exchange)
    }
}

/// One market snapshot for one instrument
///
/// Depth levels 2-5 are all-or-nothing: a zero `bid_price_2` means no
/// depth data, and levels 2-5 on both sides are ignored by persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickData {
    pub symbol: String,
    pub exchange: Exchange,
    pub datetime: DateTime<Utc>,

    pub name: String,
    pub volume: f64,
    pub open_interest: f64,
    pub last_price: f64,
    pub last_volume: f64,
    pub limit_up: f64,
    pub limit_down: f64,

    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub pre_close: f64,

    pub bid_price_1: f64,
    pub bid_price_2: f64,
    pub bid_price_3: f64,
    pub bid_price_4: f64,
    pub bid_price_5: f64,

    pub ask_price_1: f64,
    pub ask_price_2: f64,
    pub ask_price_3: f64,
    pub ask_price_4: f64,
    pub ask_price_5: f64,

    pub bid_volume_1: f64,
    pub bid_volume_2: f64,
    pub bid_volume_3: f64,
    pub bid_volume_4: f64,
    pub bid_volume_5: f64,

    pub ask_volume_1: f64,
    pub ask_volume_2: f64,
    pub ask_volume_3: f64,
    pub ask_volume_4: f64,
    pub ask_volume_5: f64,
}

impl TickData {
    /// Create a tick with all market fields zeroed
    pub fn new(symbol: impl Into<String>, exchange: Exchange, datetime: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
            datetime,
            name: String::new(),
            volume: 0.0,
            open_interest: 0.0,
            last_price: 0.0,
            last_volume: 0.0,
            limit_up: 0.0,
            limit_down: 0.0,
            open_price: 0.0,
            high_price: 0.0,
            low_price: 0.0,
            pre_close: 0.0,
            bid_price_1: 0.0,
            bid_price_2: 0.0,
            bid_price_3: 0.0,
            bid_price_4: 0.0,
            bid_price_5: 0.0,
            ask_price_1: 0.0,
            ask_price_2: 0.0,
            ask_price_3: 0.0,
            ask_price_4: 0.0,
            ask_price_5: 0.0,
            bid_volume_1: 0.0,
            bid_volume_2: 0.0,
            bid_volume_3: 0.0,
            bid_volume_4: 0.0,
            bid_volume_5: 0.0,
            ask_volume_1: 0.0,
            ask_volume_2: 0.0,
            ask_volume_3: 0.0,
            ask_volume_4: 0.0,
            ask_volume_5: 0.0,
        }
    }

    /// Whether the tick carries order-book depth beyond the top level
    pub fn has_depth(&self) -> bool {
        self.bid_price_2 != 0.0
    }

    /// Get the full instrument identifier (symbol@exchange)
    pub fn full_symbol(&self) -> String {
        format!("{}@{}", self.symbol, self.exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_codes() {
        assert_eq!(Exchange::Nasdaq.as_str(), "NASDAQ");
        assert_eq!(Exchange::from_code("nasdaq"), Some(Exchange::Nasdaq));
        assert_eq!(Exchange::from_code("SHFE"), Some(Exchange::Shfe));
        assert_eq!(Exchange::from_code("unknown"), None);
    }

    #[test]
    fn test_interval_codes() {
        assert_eq!(Interval::Minute.as_str(), "1m");
        assert_eq!(Interval::from_code("1h"), Some(Interval::Hour));
        assert_eq!(Interval::from_code("d"), Some(Interval::Daily));
        assert_eq!(Interval::from_code("5m"), None);
    }

    #[test]
    fn test_tick_depth_guard() {
        let mut tick = TickData::new("rb2405", Exchange::Shfe, Utc::now());
        assert!(!tick.has_depth());
        tick.bid_price_2 = 3_900.0;
        assert!(tick.has_depth());
        assert_eq!(tick.full_symbol(), "rb2405@SHFE");
    }
}
