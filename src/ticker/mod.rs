//! Ticker aggregation
//!
//! Fetches raw tickers through the exchange ports, normalizes them and
//! merges results across exchanges. Two retrieval shapes with different
//! failure semantics:
//!
//! - [`TickerAggregator::fetch_all_exchanges`]: one task per exchange, all
//!   joined. Any failure fails the whole call with [`AggregateError`].
//! - [`TickerAggregator::fetch_popular`]: fixed pairs fetched one by one.
//!   The first failure stops the loop and is returned as-is.

pub mod normalize;

pub use normalize::{change_percent, normalize_binance, normalize_coinone};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::client::{BinanceClient, BinanceTicker, CoinoneClient, CoinoneTickerResponse};
use crate::error::{AggregateError, ApiError};
use crate::types::{Exchange, NormalizedTicker};

/// Pairs returned by [`TickerAggregator::fetch_popular`], in order
pub const POPULAR_TICKERS: [(Exchange, &str); 4] = [
    (Exchange::Coinone, "BTC"),
    (Exchange::Coinone, "ETH"),
    (Exchange::Binance, "BTC"),
    (Exchange::Binance, "ETH"),
];

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoinoneTickerApi: Send + Sync {
    async fn fetch_ticker(
        &self,
        quote_currency: &str,
        target_currency: &str,
    ) -> Result<CoinoneTickerResponse, ApiError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BinanceTickerApi: Send + Sync {
    async fn fetch_ticker(&self, symbol: &str) -> Result<BinanceTicker, ApiError>;
}

#[async_trait]
impl CoinoneTickerApi for CoinoneClient {
    async fn fetch_ticker(
        &self,
        quote_currency: &str,
        target_currency: &str,
    ) -> Result<CoinoneTickerResponse, ApiError> {
        self.get_ticker(quote_currency, target_currency).await
    }
}

#[async_trait]
impl BinanceTickerApi for BinanceClient {
    async fn fetch_ticker(&self, symbol: &str) -> Result<BinanceTicker, ApiError> {
        self.get_ticker(symbol).await
    }
}

#[derive(Clone)]
pub struct TickerAggregator {
    coinone: Arc<dyn CoinoneTickerApi>,
    binance: Arc<dyn BinanceTickerApi>,
}

impl TickerAggregator {
    pub fn new(coinone: Arc<dyn CoinoneTickerApi>, binance: Arc<dyn BinanceTickerApi>) -> Self {
        Self { coinone, binance }
    }

    /// Normalized ticker of `currency` on one exchange.
    ///
    /// Failures come back exactly as the exchange produced them.
    pub async fn fetch_normalized(
        &self,
        exchange: Exchange,
        currency: &str,
    ) -> Result<NormalizedTicker, ApiError> {
        let currency = currency.to_ascii_uppercase();
        match exchange {
            Exchange::Coinone => {
                let response = self
                    .coinone
                    .fetch_ticker(exchange.quote_currency(), &currency)
                    .await?;
                let ticker = response
                    .tickers
                    .first()
                    .ok_or_else(|| ApiError::TickerNotFound {
                        exchange,
                        symbol: exchange.symbol(&currency),
                    })?;
                normalize_coinone(&currency, ticker, Utc::now())
            }
            Exchange::Binance => {
                let ticker = self.binance.fetch_ticker(&exchange.symbol(&currency)).await?;
                normalize_binance(&currency, &ticker, Utc::now())
            }
        }
    }

    /// `currency` on every exchange, fetched in parallel.
    ///
    /// All tasks run to completion. The error reports the first failure to
    /// complete; results are ordered as [`Exchange::ALL`].
    pub async fn fetch_all_exchanges(
        &self,
        currency: &str,
    ) -> Result<Vec<NormalizedTicker>, AggregateError> {
        let mut tasks: FuturesUnordered<_> = Exchange::ALL
            .iter()
            .enumerate()
            .map(|(index, &exchange)| {
                let aggregator = self.clone();
                let currency = currency.to_string();
                let handle = tokio::spawn(async move {
                    aggregator.fetch_normalized(exchange, &currency).await
                });
                async move { (index, exchange, handle.await) }
            })
            .collect();

        let mut slots: Vec<Option<NormalizedTicker>> = vec![None; Exchange::ALL.len()];
        let mut first_failure = None;

        while let Some((index, exchange, joined)) = tasks.next().await {
            let failure = match joined {
                Ok(Ok(ticker)) => {
                    slots[index] = Some(ticker);
                    continue;
                }
                Ok(Err(source)) => AggregateError::ExchangeFailed { exchange, source },
                Err(source) => AggregateError::TaskFailed { exchange, source },
            };
            tracing::warn!(exchange = %exchange, error = %failure, "Ticker task failed");
            if first_failure.is_none() {
                first_failure = Some(failure);
            }
        }

        if let Some(failure) = first_failure {
            return Err(failure);
        }
        tracing::info!(currency = %currency, exchanges = slots.len(), "Fetched tickers from all exchanges");
        Ok(slots.into_iter().flatten().collect())
    }

    /// [`POPULAR_TICKERS`], one request at a time
    pub async fn fetch_popular(&self) -> Result<Vec<NormalizedTicker>, ApiError> {
        let mut tickers = Vec::with_capacity(POPULAR_TICKERS.len());
        for (exchange, currency) in POPULAR_TICKERS {
            tickers.push(self.fetch_normalized(exchange, currency).await?);
        }
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CoinoneTicker;
    use crate::error::{ErrorCode, ExchangeError};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn coinone_response(last: &str) -> CoinoneTickerResponse {
        CoinoneTickerResponse {
            result: "success".to_string(),
            error_code: "0".to_string(),
            server_time: None,
            tickers: vec![CoinoneTicker {
                first: Some("94000000".to_string()),
                last: Some(last.to_string()),
                ..Default::default()
            }],
        }
    }

    fn binance_ticker(last: &str) -> BinanceTicker {
        BinanceTicker {
            open_price: Some("65000".to_string()),
            last_price: Some(last.to_string()),
            ..Default::default()
        }
    }

    fn coinone_error() -> ApiError {
        ApiError::Exchange(ExchangeError {
            exchange: Exchange::Coinone,
            code: ErrorCode::Text("405".to_string()),
            message: "Invalid currency".to_string(),
            http_status: 200,
        })
    }

    struct PanickingBinance;

    #[async_trait]
    impl BinanceTickerApi for PanickingBinance {
        async fn fetch_ticker(&self, _symbol: &str) -> Result<BinanceTicker, ApiError> {
            panic!("connection pool poisoned")
        }
    }

    fn aggregator(coinone: MockCoinoneTickerApi, binance: MockBinanceTickerApi) -> TickerAggregator {
        TickerAggregator::new(Arc::new(coinone), Arc::new(binance))
    }

    #[tokio::test]
    async fn test_fetch_normalized_builds_exchange_symbols() {
        let mut coinone = MockCoinoneTickerApi::new();
        coinone
            .expect_fetch_ticker()
            .withf(|quote, target| quote == "KRW" && target == "BTC")
            .times(1)
            .returning(|_, _| Ok(coinone_response("95000000")));
        let mut binance = MockBinanceTickerApi::new();
        binance
            .expect_fetch_ticker()
            .withf(|symbol| symbol == "BTCUSDT")
            .times(1)
            .returning(|_| Ok(binance_ticker("66000")));

        let aggregator = aggregator(coinone, binance);
        let coinone = aggregator.fetch_normalized(Exchange::Coinone, "btc").await.unwrap();
        assert_eq!(coinone.symbol, "BTC/KRW");
        assert_eq!(coinone.change_percent, dec!(1.0600));

        let binance = aggregator.fetch_normalized(Exchange::Binance, "BTC").await.unwrap();
        assert_eq!(binance.symbol, "BTCUSDT");
        assert_eq!(binance.price, dec!(66000));
    }

    #[tokio::test]
    async fn test_empty_ticker_list_is_not_found() {
        let mut coinone = MockCoinoneTickerApi::new();
        coinone.expect_fetch_ticker().returning(|_, _| {
            let mut response = coinone_response("1");
            response.tickers.clear();
            Ok(response)
        });

        let err = aggregator(coinone, MockBinanceTickerApi::new())
            .fetch_normalized(Exchange::Coinone, "XYZ")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::TickerNotFound { exchange: Exchange::Coinone, ref symbol } if symbol == "XYZ/KRW"
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fetch_all_exchanges_keeps_exchange_order() {
        let mut coinone = MockCoinoneTickerApi::new();
        coinone.expect_fetch_ticker().times(1).returning(|_, _| {
            // Finish after Binance
            std::thread::sleep(Duration::from_millis(50));
            Ok(coinone_response("95000000"))
        });
        let mut binance = MockBinanceTickerApi::new();
        binance
            .expect_fetch_ticker()
            .times(1)
            .returning(|_| Ok(binance_ticker("66000")));

        let tickers = aggregator(coinone, binance)
            .fetch_all_exchanges("BTC")
            .await
            .unwrap();
        let order: Vec<Exchange> = tickers.iter().map(|t| t.exchange).collect();
        assert_eq!(order, vec![Exchange::Coinone, Exchange::Binance]);
    }

    #[tokio::test]
    async fn test_fetch_all_exchanges_fails_when_one_exchange_fails() {
        let mut coinone = MockCoinoneTickerApi::new();
        coinone
            .expect_fetch_ticker()
            .times(1)
            .returning(|_, _| Err(coinone_error()));
        // Binance still runs to completion
        let mut binance = MockBinanceTickerApi::new();
        binance
            .expect_fetch_ticker()
            .times(1)
            .returning(|_| Ok(binance_ticker("66000")));

        let err = aggregator(coinone, binance)
            .fetch_all_exchanges("BTC")
            .await
            .unwrap_err();
        match err {
            AggregateError::ExchangeFailed { exchange, source } => {
                assert_eq!(exchange, Exchange::Coinone);
                assert!(matches!(source, ApiError::Exchange(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_all_exchanges_reports_panicked_task() {
        let mut coinone = MockCoinoneTickerApi::new();
        coinone
            .expect_fetch_ticker()
            .returning(|_, _| Ok(coinone_response("95000000")));
        let aggregator = TickerAggregator::new(Arc::new(coinone), Arc::new(PanickingBinance));
        let err = aggregator
            .fetch_all_exchanges("BTC")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AggregateError::TaskFailed { exchange: Exchange::Binance, .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_popular_stops_at_first_failure() {
        let mut coinone = MockCoinoneTickerApi::new();
        coinone
            .expect_fetch_ticker()
            .withf(|_, target| target == "BTC")
            .times(1)
            .returning(|_, _| Err(coinone_error()));
        coinone
            .expect_fetch_ticker()
            .withf(|_, target| target == "ETH")
            .never();
        let mut binance = MockBinanceTickerApi::new();
        binance.expect_fetch_ticker().never();

        let err = aggregator(coinone, binance)
            .fetch_popular()
            .await
            .unwrap_err();
        // Sequential failures are not wrapped
        assert!(matches!(err, ApiError::Exchange(ref e) if e.exchange == Exchange::Coinone));
    }

    #[tokio::test]
    async fn test_fetch_popular_returns_pairs_in_order() {
        let mut coinone = MockCoinoneTickerApi::new();
        coinone
            .expect_fetch_ticker()
            .times(2)
            .returning(|_, _| Ok(coinone_response("95000000")));
        let mut binance = MockBinanceTickerApi::new();
        binance
            .expect_fetch_ticker()
            .times(2)
            .returning(|_| Ok(binance_ticker("66000")));

        let tickers = aggregator(coinone, binance).fetch_popular().await.unwrap();
        let symbols: Vec<&str> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC/KRW", "ETH/KRW", "BTCUSDT", "ETHUSDT"]);
    }
}
