//! Exchange HTTP transport
//!
//! Every call runs the same pipeline: authenticate (private endpoints only),
//! log the signed request, send, then run the exchange's error classifier
//! over the raw response before anything is decoded.

pub mod binance;
pub mod coinone;

pub use binance::{BinanceAccount, BinanceBalance, BinanceClient, BinanceTicker};
pub use coinone::{
    BookEntry, CoinoneAccountResponse, CoinoneBalance, CoinoneClient, CoinoneOrderRequest,
    CoinoneOrderResponse, CoinoneTicker, CoinoneTickerResponse, OrderSide, OrderType,
};

use std::sync::Arc;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client,
};
use serde::de::DeserializeOwned;

use crate::auth::{log_signed_request, OutboundRequest, RequestAuthenticator, SignedRequest};
use crate::classify::RawResponse;
use crate::config::Timeouts;
use crate::error::ApiError;
use crate::types::Exchange;

/// One base URL of one exchange, optionally with an authenticator.
#[derive(Clone)]
pub struct ExchangeHttp {
    exchange: Exchange,
    client: Client,
    base_url: String,
    authenticator: Option<Arc<dyn RequestAuthenticator>>,
}

impl ExchangeHttp {
    pub fn new(
        exchange: Exchange,
        base_url: &str,
        timeouts: Timeouts,
        authenticator: Option<Arc<dyn RequestAuthenticator>>,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.read)
            .default_headers(headers)
            .build()
            .map_err(|source| ApiError::Transport { exchange, source })?;

        Ok(Self {
            exchange,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authenticator,
        })
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign (when an authenticator is set) and log the request
    pub fn prepare(&self, request: OutboundRequest) -> Result<SignedRequest, ApiError> {
        let signed = match &self.authenticator {
            Some(authenticator) => {
                authenticator
                    .authenticate(request)
                    .map_err(|source| ApiError::Auth {
                        exchange: self.exchange,
                        source,
                    })?
            }
            None => SignedRequest::unsigned(request),
        };
        log_signed_request(self.exchange, &signed);
        Ok(signed)
    }

    /// Send a request and return its raw response once it passed classification
    pub async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, ApiError> {
        let signed = self.prepare(request)?;
        let url = format!("{}{}", self.base_url, signed.path_and_query());

        let mut builder = self
            .client
            .request(signed.method.clone(), &url)
            .headers(signed.headers);
        if let Some(body) = signed.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|source| ApiError::Transport {
            exchange: self.exchange,
            source,
        })?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|source| ApiError::Transport {
            exchange: self.exchange,
            source,
        })?;
        let raw = RawResponse::new(status, body.to_vec());

        let classifier = self.exchange.classifier();
        if classifier.has_error(&raw) {
            let error = classifier.classify(&raw);
            tracing::warn!(
                exchange = %self.exchange,
                method = %signed.method,
                path = %signed.path,
                error = %error,
                "Exchange request failed"
            );
            return Err(error.into());
        }

        tracing::debug!(
            exchange = %self.exchange,
            status,
            bytes = raw.body.len(),
            "Exchange response received"
        );
        Ok(raw)
    }

    /// [`execute`](Self::execute) and decode the body as JSON
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: OutboundRequest,
    ) -> Result<T, ApiError> {
        let raw = self.execute(request).await?;
        decode(self.exchange, &raw)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(
    exchange: Exchange,
    raw: &RawResponse,
) -> Result<T, ApiError> {
    serde_json::from_slice(&raw.body).map_err(|source| ApiError::Decode { exchange, source })
}

impl std::fmt::Debug for ExchangeHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeHttp")
            .field("exchange", &self.exchange)
            .field("base_url", &self.base_url)
            .field("signed", &self.authenticator.is_some())
            .finish()
    }
}
