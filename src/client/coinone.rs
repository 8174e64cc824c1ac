//! Coinone REST client
//!
//! Public ticker endpoint plus the signed account-balance and order
//! endpoints.
//! Numeric fields arrive as strings and are kept that way until
//! normalization.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ExchangeHttp;
use crate::auth::{CoinoneAuthenticator, OutboundRequest};
use crate::config::CoinoneConfig;
use crate::error::{ApiError, AuthError};
use crate::types::Exchange;

#[derive(Debug, Clone, Deserialize)]
pub struct CoinoneTickerResponse {
    pub result: String,
    pub error_code: String,
    #[serde(default)]
    pub server_time: Option<i64>,
    #[serde(default)]
    pub tickers: Vec<CoinoneTicker>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoinoneTicker {
    #[serde(default)]
    pub quote_currency: Option<String>,
    #[serde(default)]
    pub target_currency: Option<String>,
    /// Milliseconds since epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub high: Option<String>,
    #[serde(default)]
    pub low: Option<String>,
    /// Opening price of the 24h window
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub quote_volume: Option<String>,
    #[serde(default)]
    pub target_volume: Option<String>,
    #[serde(default)]
    pub best_asks: Vec<BookEntry>,
    #[serde(default)]
    pub best_bids: Vec<BookEntry>,
    #[serde(default)]
    pub id: Option<String>,
}

/// One top-of-book level
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookEntry {
    pub price: Option<String>,
    pub qty: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinoneAccountResponse {
    pub result: String,
    pub error_code: String,
    #[serde(default)]
    pub balances: Vec<CoinoneBalance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinoneBalance {
    pub currency: String,
    pub available: String,
    /// Amount locked in open orders
    pub limit: String,
    #[serde(default)]
    pub average_price: Option<String>,
}

#[derive(Serialize)]
struct BalanceRequest<'a> {
    currencies: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
    StopLimit,
}

/// Body of `POST /order`.
///
/// Unset fields are left out of the JSON entirely. `access_token` and
/// `nonce` are added at signing time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinoneOrderRequest {
    pub side: OrderSide,
    pub quote_currency: String,
    pub target_currency: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<String>,
    /// Quote-currency amount; market buys only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub post_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<String>,
}

impl CoinoneOrderRequest {
    fn base(side: OrderSide, order_type: OrderType, quote: &str, target: &str) -> Self {
        Self {
            side,
            quote_currency: quote.to_ascii_uppercase(),
            target_currency: target.to_ascii_uppercase(),
            order_type,
            price: None,
            qty: None,
            amount: None,
            post_only: false,
            limit_price: None,
            trigger_price: None,
        }
    }

    pub fn limit(
        side: OrderSide,
        quote: &str,
        target: &str,
        price: impl Into<String>,
        qty: impl Into<String>,
        post_only: bool,
    ) -> Self {
        Self {
            price: Some(price.into()),
            qty: Some(qty.into()),
            post_only,
            ..Self::base(side, OrderType::Limit, quote, target)
        }
    }

    /// Market buy spending `amount` of the quote currency
    pub fn market_buy(
        quote: &str,
        target: &str,
        amount: impl Into<String>,
        limit_price: Option<String>,
    ) -> Self {
        Self {
            amount: Some(amount.into()),
            limit_price,
            ..Self::base(OrderSide::Buy, OrderType::Market, quote, target)
        }
    }

    /// Market sell of `qty` units of the target currency
    pub fn market_sell(
        quote: &str,
        target: &str,
        qty: impl Into<String>,
        limit_price: Option<String>,
    ) -> Self {
        Self {
            qty: Some(qty.into()),
            limit_price,
            ..Self::base(OrderSide::Sell, OrderType::Market, quote, target)
        }
    }

    pub fn stop_limit(
        side: OrderSide,
        quote: &str,
        target: &str,
        price: impl Into<String>,
        qty: impl Into<String>,
        trigger_price: impl Into<String>,
    ) -> Self {
        Self {
            price: Some(price.into()),
            qty: Some(qty.into()),
            trigger_price: Some(trigger_price.into()),
            ..Self::base(side, OrderType::StopLimit, quote, target)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinoneOrderResponse {
    pub result: String,
    pub error_code: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Serialize)]
struct CancelAllRequest<'a> {
    quote_currency: &'a str,
    target_currency: &'a str,
}

#[derive(Debug, Clone)]
pub struct CoinoneClient {
    public: ExchangeHttp,
    private: ExchangeHttp,
}

impl CoinoneClient {
    pub fn new(config: &CoinoneConfig) -> Result<Self, ApiError> {
        let authenticator = Arc::new(CoinoneAuthenticator::from_config(config));
        Ok(Self {
            public: ExchangeHttp::new(
                Exchange::Coinone,
                &config.public_url,
                config.timeouts(),
                None,
            )?,
            private: ExchangeHttp::new(
                Exchange::Coinone,
                &config.private_url,
                config.timeouts(),
                Some(authenticator),
            )?,
        })
    }

    /// `GET /ticker_new/{quote}/{target}`
    pub async fn get_ticker(
        &self,
        quote_currency: &str,
        target_currency: &str,
    ) -> Result<CoinoneTickerResponse, ApiError> {
        let path = format!(
            "/ticker_new/{}/{}",
            quote_currency.to_ascii_uppercase(),
            target_currency.to_ascii_uppercase()
        );
        self.public.execute_json(OutboundRequest::get(path)).await
    }

    /// `POST /account/balance` for the given currencies
    pub async fn get_balances(
        &self,
        currencies: &[String],
    ) -> Result<CoinoneAccountResponse, ApiError> {
        let request = signed_post("/account/balance", &BalanceRequest { currencies })?;
        self.private.execute_json(request).await
    }

    /// `POST /account/balance/all`
    pub async fn get_all_balances(&self) -> Result<CoinoneAccountResponse, ApiError> {
        self.private
            .execute_json(OutboundRequest::post("/account/balance/all"))
            .await
    }

    /// `POST /order`
    pub async fn place_order(
        &self,
        order: &CoinoneOrderRequest,
    ) -> Result<CoinoneOrderResponse, ApiError> {
        let request = signed_post("/order", order)?;
        let response: CoinoneOrderResponse = self.private.execute_json(request).await?;
        tracing::info!(
            side = ?order.side,
            order_type = ?order.order_type,
            pair = %format!("{}/{}", order.target_currency, order.quote_currency),
            order_id = ?response.order_id,
            "Coinone order placed"
        );
        Ok(response)
    }

    /// `POST /order/cancel/all`: cancel every open order on one pair.
    ///
    /// The response is returned as raw fields.
    pub async fn cancel_all_orders(
        &self,
        quote_currency: &str,
        target_currency: &str,
    ) -> Result<HashMap<String, Value>, ApiError> {
        let quote = quote_currency.to_ascii_uppercase();
        let target = target_currency.to_ascii_uppercase();
        let request = signed_post(
            "/order/cancel/all",
            &CancelAllRequest {
                quote_currency: &quote,
                target_currency: &target,
            },
        )?;
        let response = self.private.execute_json(request).await?;
        tracing::info!(pair = %format!("{}/{}", target, quote), "Coinone open orders cancelled");
        Ok(response)
    }
}

fn signed_post<T: Serialize>(path: &str, body: &T) -> Result<OutboundRequest, ApiError> {
    OutboundRequest::post(path)
        .json(body)
        .map_err(|e| ApiError::Auth {
            exchange: Exchange::Coinone,
            source: AuthError::Canonicalization(e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_response_decodes() {
        let body = r#"{
            "result": "success",
            "error_code": "0",
            "server_time": 1701173451000,
            "tickers": [{
                "quote_currency": "KRW",
                "target_currency": "BTC",
                "timestamp": 1701173450000,
                "high": "95500000",
                "low": "93800000",
                "first": "94000000",
                "last": "95000000",
                "quote_volume": "12345678901.1",
                "target_volume": "130.5",
                "best_asks": [{"price": "95010000", "qty": "0.1"}],
                "best_bids": [],
                "id": "1701173450001"
            }]
        }"#;
        let response: CoinoneTickerResponse = serde_json::from_str(body).unwrap();
        let ticker = &response.tickers[0];
        assert_eq!(ticker.last.as_deref(), Some("95000000"));
        assert_eq!(ticker.best_asks[0].price.as_deref(), Some("95010000"));
        assert!(ticker.best_bids.is_empty());
    }

    #[test]
    fn test_ticker_without_book_decodes() {
        let body = r#"{"result":"success","error_code":"0","tickers":[{"last":null}]}"#;
        let response: CoinoneTickerResponse = serde_json::from_str(body).unwrap();
        assert!(response.tickers[0].best_bids.is_empty());
        assert!(response.tickers[0].last.is_none());
    }

    #[test]
    fn test_balance_request_body() {
        let currencies = vec!["BTC".to_string(), "ETH".to_string()];
        let body = serde_json::to_string(&BalanceRequest {
            currencies: &currencies,
        })
        .unwrap();
        assert_eq!(body, r#"{"currencies":["BTC","ETH"]}"#);
    }

    #[test]
    fn test_limit_order_body_skips_unset_fields() {
        let order = CoinoneOrderRequest::limit(OrderSide::Buy, "krw", "btc", "94000000", "0.01", true);
        let body = serde_json::to_string(&order).unwrap();
        assert_eq!(
            body,
            r#"{"side":"BUY","quote_currency":"KRW","target_currency":"BTC","type":"LIMIT","price":"94000000","qty":"0.01","post_only":true}"#
        );
    }

    #[test]
    fn test_market_orders_use_amount_or_qty() {
        let buy = serde_json::to_value(CoinoneOrderRequest::market_buy("KRW", "ETH", "100000", None))
            .unwrap();
        assert_eq!(buy["amount"], "100000");
        assert!(buy.get("qty").is_none());
        assert!(buy.get("limit_price").is_none());

        let sell = serde_json::to_value(CoinoneOrderRequest::market_sell(
            "KRW",
            "ETH",
            "0.5",
            Some("3000000".to_string()),
        ))
        .unwrap();
        assert_eq!(sell["side"], "SELL");
        assert_eq!(sell["type"], "MARKET");
        assert_eq!(sell["qty"], "0.5");
        assert_eq!(sell["limit_price"], "3000000");
        assert!(sell.get("amount").is_none());
    }

    #[test]
    fn test_stop_limit_order_body() {
        let order =
            CoinoneOrderRequest::stop_limit(OrderSide::Sell, "KRW", "BTC", "93000000", "0.02", "93500000");
        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(body["type"], "STOP_LIMIT");
        assert_eq!(body["trigger_price"], "93500000");
        assert_eq!(body["post_only"], false);
    }

    #[test]
    fn test_order_response_decodes() {
        let body = r#"{"result":"success","error_code":"0","order_id":"0e30219d-1b4e-4d2f-8a32-f3a2a6b0f8a1"}"#;
        let response: CoinoneOrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            response.order_id.as_deref(),
            Some("0e30219d-1b4e-4d2f-8a32-f3a2a6b0f8a1")
        );
    }

    #[test]
    fn test_cancel_all_request_body() {
        let body = serde_json::to_string(&CancelAllRequest {
            quote_currency: "KRW",
            target_currency: "BTC",
        })
        .unwrap();
        assert_eq!(body, r#"{"quote_currency":"KRW","target_currency":"BTC"}"#);
    }

    #[test]
    fn test_account_response_decodes() {
        let body = r#"{"result":"success","error_code":"0","balances":[
            {"available":"1.5","limit":"0.2","average_price":"90000000","currency":"BTC"}
        ]}"#;
        let response: CoinoneAccountResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.balances[0].currency, "BTC");
        assert_eq!(response.balances[0].limit, "0.2");
    }
}
