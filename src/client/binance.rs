//! Binance REST client
//!
//! 24h ticker (public) and account information (signed GET).

use std::sync::Arc;

use serde::Deserialize;

use super::ExchangeHttp;
use crate::auth::{BinanceAuthenticator, OutboundRequest};
use crate::config::BinanceConfig;
use crate::error::ApiError;
use crate::types::Exchange;

/// `GET /api/v3/ticker/24hr` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BinanceTicker {
    pub symbol: Option<String>,
    pub price_change: Option<String>,
    pub price_change_percent: Option<String>,
    pub weighted_avg_price: Option<String>,
    pub prev_close_price: Option<String>,
    pub last_price: Option<String>,
    pub last_qty: Option<String>,
    pub bid_price: Option<String>,
    pub bid_qty: Option<String>,
    pub ask_price: Option<String>,
    pub ask_qty: Option<String>,
    pub open_price: Option<String>,
    pub high_price: Option<String>,
    pub low_price: Option<String>,
    pub volume: Option<String>,
    pub quote_volume: Option<String>,
    pub open_time: Option<i64>,
    pub close_time: Option<i64>,
    pub count: Option<i64>,
}

/// `GET /api/v3/account` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceAccount {
    #[serde(default)]
    pub maker_commission: i64,
    #[serde(default)]
    pub taker_commission: i64,
    #[serde(default)]
    pub can_trade: bool,
    #[serde(default)]
    pub can_withdraw: bool,
    #[serde(default)]
    pub can_deposit: bool,
    #[serde(default)]
    pub update_time: i64,
    #[serde(default)]
    pub account_type: String,
    #[serde(default)]
    pub balances: Vec<BinanceBalance>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceBalance {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

#[derive(Debug, Clone)]
pub struct BinanceClient {
    public: ExchangeHttp,
    private: ExchangeHttp,
}

impl BinanceClient {
    pub fn new(config: &BinanceConfig) -> Result<Self, ApiError> {
        let authenticator = Arc::new(BinanceAuthenticator::from_config(config));
        Ok(Self {
            public: ExchangeHttp::new(
                Exchange::Binance,
                &config.base_url,
                config.timeouts(),
                None,
            )?,
            private: ExchangeHttp::new(
                Exchange::Binance,
                &config.base_url,
                config.timeouts(),
                Some(authenticator),
            )?,
        })
    }

    /// `GET /api/v3/ticker/24hr?symbol=...`
    pub async fn get_ticker(&self, symbol: &str) -> Result<BinanceTicker, ApiError> {
        let request = OutboundRequest::get("/api/v3/ticker/24hr")
            .query("symbol", symbol.to_ascii_uppercase());
        self.public.execute_json(request).await
    }

    /// Signed `GET /api/v3/account`
    pub async fn get_account(&self, omit_zero_balances: bool) -> Result<BinanceAccount, ApiError> {
        let request =
            OutboundRequest::get("/api/v3/account").query("omitZeroBalances", omit_zero_balances);
        self.private.execute_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_decodes_camel_case() {
        let body = r#"{
            "symbol": "BTCUSDT",
            "priceChange": "1000.00",
            "priceChangePercent": "1.538",
            "lastPrice": "66000.00",
            "bidPrice": "65999.99",
            "askPrice": "66000.01",
            "openPrice": "65000.00",
            "highPrice": "66500.00",
            "lowPrice": "64800.00",
            "volume": "12345.678",
            "openTime": 1700000000000,
            "closeTime": 1700086400000,
            "count": 100
        }"#;
        let ticker: BinanceTicker = serde_json::from_str(body).unwrap();
        assert_eq!(ticker.last_price.as_deref(), Some("66000.00"));
        assert_eq!(ticker.open_price.as_deref(), Some("65000.00"));
        assert_eq!(ticker.close_time, Some(1_700_086_400_000));
        assert!(ticker.quote_volume.is_none());
    }

    #[test]
    fn test_account_decodes() {
        let body = r#"{
            "makerCommission": 10, "takerCommission": 10,
            "canTrade": true, "canWithdraw": true, "canDeposit": true,
            "updateTime": 123456789, "accountType": "SPOT",
            "balances": [{"asset": "BTC", "free": "0.5", "locked": "0.0"}],
            "permissions": ["SPOT"]
        }"#;
        let account: BinanceAccount = serde_json::from_str(body).unwrap();
        assert!(account.can_trade);
        assert_eq!(account.balances[0].free, "0.5");
        assert_eq!(account.permissions, vec!["SPOT"]);
    }
}
