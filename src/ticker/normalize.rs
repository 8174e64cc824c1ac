//! Raw exchange tickers → [`NormalizedTicker`]

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::client::{BinanceTicker, CoinoneTicker};
use crate::error::ApiError;
use crate::types::{Exchange, NormalizedTicker};

/// Percent change from `first` to `last`.
///
/// The ratio is rounded half-up to 4 decimal places before scaling by 100,
/// so 94000000 → 95000000 yields `1.0600`. The result always carries four
/// decimal places (`50.0000`, `0.0000`). Zero when either price is absent or
/// `first` is zero.
pub fn change_percent(first: Option<Decimal>, last: Option<Decimal>) -> Decimal {
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) if !first.is_zero() => (first, last),
        _ => return Decimal::ZERO,
    };

    last.checked_sub(first)
        .and_then(|delta| delta.checked_div(first))
        .map(|ratio| {
            let mut ratio = ratio.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
            ratio.rescale(4);
            ratio
        })
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .unwrap_or(Decimal::ZERO)
}

pub fn normalize_coinone(
    currency: &str,
    ticker: &CoinoneTicker,
    now: DateTime<Utc>,
) -> Result<NormalizedTicker, ApiError> {
    let exchange = Exchange::Coinone;
    let first = parse(exchange, "first", ticker.first.as_deref())?;
    let last = parse(exchange, "last", ticker.last.as_deref())?;
    let bid = ticker.best_bids.first().and_then(|entry| entry.price.as_deref());
    let ask = ticker.best_asks.first().and_then(|entry| entry.price.as_deref());

    Ok(NormalizedTicker {
        exchange,
        symbol: exchange.symbol(currency),
        price: last.unwrap_or_default(),
        high_price: parse(exchange, "high", ticker.high.as_deref())?.unwrap_or_default(),
        low_price: parse(exchange, "low", ticker.low.as_deref())?.unwrap_or_default(),
        bid_price: parse(exchange, "best_bids.price", bid)?,
        ask_price: parse(exchange, "best_asks.price", ask)?,
        change_percent: change_percent(first, last),
        volume: parse(exchange, "target_volume", ticker.target_volume.as_deref())?
            .unwrap_or_default(),
        timestamp: now,
    })
}

/// Binance ticker in the shared shape.
///
/// `change_percent` is recomputed from `openPrice` and `lastPrice` with the
/// same rounding as Coinone. It is not Binance's own `priceChangePercent`,
/// so it can differ from the figure shown in Binance's UI.
pub fn normalize_binance(
    currency: &str,
    ticker: &BinanceTicker,
    now: DateTime<Utc>,
) -> Result<NormalizedTicker, ApiError> {
    let exchange = Exchange::Binance;
    let open = parse(exchange, "openPrice", ticker.open_price.as_deref())?;
    let last = parse(exchange, "lastPrice", ticker.last_price.as_deref())?;

    Ok(NormalizedTicker {
        exchange,
        symbol: exchange.symbol(currency),
        price: last.unwrap_or_default(),
        high_price: parse(exchange, "highPrice", ticker.high_price.as_deref())?.unwrap_or_default(),
        low_price: parse(exchange, "lowPrice", ticker.low_price.as_deref())?.unwrap_or_default(),
        bid_price: parse(exchange, "bidPrice", ticker.bid_price.as_deref())?,
        ask_price: parse(exchange, "askPrice", ticker.ask_price.as_deref())?,
        change_percent: change_percent(open, last),
        volume: parse(exchange, "volume", ticker.volume.as_deref())?.unwrap_or_default(),
        timestamp: now,
    })
}

/// Parse an optional decimal string; plain or scientific notation.
fn parse(
    exchange: Exchange,
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<Decimal>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(Some)
        .map_err(|_| ApiError::MalformedField {
            exchange,
            field,
            value: raw.to_string(),
        })
}
