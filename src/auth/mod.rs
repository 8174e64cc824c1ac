//! Authentication middleware
//!
//! Each private request moves through the same steps:
//! build params → attach replay token → canonicalize → sign → attach
//! signature → log → transmit. The exchange-specific parts live behind
//! [`RequestAuthenticator`]; logging runs only after signing so it sees the
//! final signed request.

pub mod binance;
pub mod coinone;

pub use binance::BinanceAuthenticator;
pub use coinone::CoinoneAuthenticator;

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use crate::error::{AuthError, CanonicalizationError};
use crate::signing::query_string;
use crate::types::Exchange;

/// Request as built by a client, before any exchange-specific signing
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    /// Serialize `body` as the JSON request body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, CanonicalizationError> {
        self.body = Some(serde_json::to_vec(body).map_err(CanonicalizationError::Serialize)?);
        Ok(self)
    }

    /// Use `body` verbatim as the request body
    pub fn raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Request in its final on-the-wire form.
///
/// Built fresh for every call; each carries its own replay token.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub path: String,
    /// Final query string, signature included when the exchange signs queries
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl SignedRequest {
    /// Pass-through for public endpoints that need no signature
    pub fn unsigned(request: OutboundRequest) -> Self {
        let query = if request.query.is_empty() {
            None
        } else {
            Some(query_string(&request.query))
        };
        Self {
            method: request.method,
            path: request.path,
            query,
            headers: HeaderMap::new(),
            body: request.body,
        }
    }

    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> Option<&str> {
        self.body
            .as_deref()
            .and_then(|body| std::str::from_utf8(body).ok())
    }
}

/// Exchange-specific signing strategy
pub trait RequestAuthenticator: Send + Sync {
    fn exchange(&self) -> Exchange;

    /// Attach replay token and signature to `request`
    fn authenticate(&self, request: OutboundRequest) -> Result<SignedRequest, AuthError>;
}

/// Insert a header, mapping invalid values to [`AuthError::InvalidHeader`].
///
/// `name` must be lowercase.
pub(crate) fn insert_header(
    headers: &mut HeaderMap,
    name: &'static str,
    value: &str,
) -> Result<(), AuthError> {
    let value = HeaderValue::from_str(value).map_err(|_| AuthError::InvalidHeader(name))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// Debug-log the final signed request. Header values and bodies are not logged.
pub fn log_signed_request(exchange: Exchange, request: &SignedRequest) {
    let header_names: Vec<&str> = request.headers.keys().map(|name| name.as_str()).collect();
    tracing::debug!(
        exchange = %exchange,
        method = %request.method,
        target = %request.path_and_query(),
        headers = ?header_names,
        body_bytes = request.body.as_ref().map_or(0, Vec::len),
        "Outbound request"
    );
}
