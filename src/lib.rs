//! Coinbridge Library
//!
//! Signed requests, error classification and ticker aggregation for
//! Coinone (KRW markets) and Binance (USDT markets)

pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod signing;
pub mod ticker;
pub mod types;

pub use error::{AggregateError, ApiError, ExchangeError};
pub use ticker::TickerAggregator;
pub use types::{Exchange, NormalizedTicker};
