//! Core types shared across coinbridge
//!
//! Exchange identity, the normalized ticker record and helpers used by
//! both the signing and the aggregation layers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Coinone,
    Binance,
}

impl Exchange {
    /// Every supported exchange, in the order multi-exchange results are returned.
    pub const ALL: [Exchange; 2] = [Exchange::Coinone, Exchange::Binance];

    /// Lowercase identifier (e.g. "coinone")
    pub fn id(&self) -> &'static str {
        match self {
            Exchange::Coinone => "coinone",
            Exchange::Binance => "binance",
        }
    }

    /// Quote currency the exchange's tickers are priced in
    pub fn quote_currency(&self) -> &'static str {
        match self {
            Exchange::Coinone => "KRW",
            Exchange::Binance => "USDT",
        }
    }

    /// Normalized symbol for a target currency.
    ///
    /// Coinone pairs render as `BTC/KRW`, Binance pairs as `BTCUSDT` (the
    /// same string the Binance API expects as its `symbol` parameter).
    pub fn symbol(&self, currency: &str) -> String {
        let currency = currency.to_ascii_uppercase();
        match self {
            Exchange::Coinone => format!("{}/{}", currency, self.quote_currency()),
            Exchange::Binance => format!("{}{}", currency, self.quote_currency()),
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "coinone" => Some(Exchange::Coinone),
            "binance" => Some(Exchange::Binance),
            _ => None,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Coinone => write!(f, "Coinone"),
            Exchange::Binance => write!(f, "Binance"),
        }
    }
}

/// Ticker normalized into one schema regardless of source exchange.
///
/// `bid_price`/`ask_price` are `None` when the source top-of-book is empty;
/// every other numeric field falls back to zero when the source omits it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTicker {
    pub exchange: Exchange,
    pub symbol: String,
    pub price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub bid_price: Option<Decimal>,
    pub ask_price: Option<Decimal>,
    /// 24h change in percent
    pub change_percent: Decimal,
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_symbols() {
        assert_eq!(Exchange::Coinone.symbol("btc"), "BTC/KRW");
        assert_eq!(Exchange::Binance.symbol("ETH"), "ETHUSDT");
    }

    #[test]
    fn test_exchange_from_str() {
        assert_eq!(Exchange::from_str("Binance"), Some(Exchange::Binance));
        assert_eq!(Exchange::from_str("COINONE"), Some(Exchange::Coinone));
        assert_eq!(Exchange::from_str("upbit"), None);
    }

    #[test]
    fn test_exchange_serializes_lowercase() {
        let json = serde_json::to_string(&Exchange::Coinone).unwrap();
        assert_eq!(json, "\"coinone\"");
    }
}
