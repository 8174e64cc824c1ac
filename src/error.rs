//! Error taxonomy for signing, classification and aggregation
//!
//! Single-exchange calls fail with [`ApiError`], which carries the exchange's
//! failure unmodified. The parallel multi-exchange path wraps the first
//! failure in [`AggregateError`] so callers can tell the two shapes apart.

use std::fmt;

use thiserror::Error;

use crate::types::Exchange;

/// Signing configuration failures (missing/invalid key or algorithm)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("secret key is missing")]
    MissingSecretKey,

    #[error("secret key rejected by HMAC")]
    InvalidKey,

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Request material that cannot be mapped to key/value pairs
#[derive(Debug, Error)]
pub enum CanonicalizationError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("request body is not a JSON object")]
    NotAnObject,

    #[error("failed to serialize signed body: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Failures raised while authenticating an outbound request
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),
}

/// Exchange-specific error code.
///
/// Coinone reports codes as strings, Binance as (negative) integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Text(String),
    Numeric(i64),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Text(code) => write!(f, "{}", code),
            ErrorCode::Numeric(code) => write!(f, "{}", code),
        }
    }
}

/// Classified failure from a live exchange response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{exchange} API error [{code}] {message} (HTTP {http_status})")]
pub struct ExchangeError {
    pub exchange: Exchange,
    pub code: ErrorCode,
    pub message: String,
    pub http_status: u16,
}

/// Error body that could not be parsed during classification.
///
/// Carries the raw HTTP status in place of an exchange error code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{exchange} returned HTTP {http_status}: {message}")]
pub struct ClassificationFallbackError {
    pub exchange: Exchange,
    pub http_status: u16,
    pub message: String,
}

/// Outcome of `ErrorClassifier::classify`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifiedError {
    #[error(transparent)]
    Exchange(ExchangeError),

    #[error(transparent)]
    Fallback(ClassificationFallbackError),
}

impl ClassifiedError {
    pub fn exchange(&self) -> Exchange {
        match self {
            ClassifiedError::Exchange(e) => e.exchange,
            ClassifiedError::Fallback(e) => e.exchange,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ClassifiedError::Exchange(e) => e.http_status,
            ClassifiedError::Fallback(e) => e.http_status,
        }
    }
}

/// Everything a single exchange call can fail with
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{exchange} request could not be signed: {source}")]
    Auth {
        exchange: Exchange,
        #[source]
        source: AuthError,
    },

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    ClassificationFallback(#[from] ClassificationFallbackError),

    #[error("{exchange} transport failure: {source}")]
    Transport {
        exchange: Exchange,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode {exchange} response: {source}")]
    Decode {
        exchange: Exchange,
        #[source]
        source: serde_json::Error,
    },

    #[error("{exchange} returned no ticker for {symbol}")]
    TickerNotFound { exchange: Exchange, symbol: String },

    #[error("{exchange} field {field} is not a decimal: {value:?}")]
    MalformedField {
        exchange: Exchange,
        field: &'static str,
        value: String,
    },
}

impl From<ClassifiedError> for ApiError {
    fn from(err: ClassifiedError) -> Self {
        match err {
            ClassifiedError::Exchange(e) => ApiError::Exchange(e),
            ClassifiedError::Fallback(e) => ApiError::ClassificationFallback(e),
        }
    }
}

impl ApiError {
    /// Exchange the failure originated from
    pub fn exchange(&self) -> Exchange {
        match self {
            ApiError::Auth { exchange, .. }
            | ApiError::Transport { exchange, .. }
            | ApiError::Decode { exchange, .. }
            | ApiError::TickerNotFound { exchange, .. }
            | ApiError::MalformedField { exchange, .. } => *exchange,
            ApiError::Exchange(e) => e.exchange,
            ApiError::ClassificationFallback(e) => e.exchange,
        }
    }
}

/// Failure of the parallel multi-exchange fetch.
///
/// References the first task failure to complete; the other tasks still ran
/// to completion and their results were discarded.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("multi-exchange fetch failed: {exchange} ticker fetch failed: {source}")]
    ExchangeFailed {
        exchange: Exchange,
        #[source]
        source: ApiError,
    },

    #[error("multi-exchange fetch failed: {exchange} task did not complete: {source}")]
    TaskFailed {
        exchange: Exchange,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl AggregateError {
    pub fn exchange(&self) -> Exchange {
        match self {
            AggregateError::ExchangeFailed { exchange, .. }
            | AggregateError::TaskFailed { exchange, .. } => *exchange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_error_display() {
        let err = ExchangeError {
            exchange: Exchange::Binance,
            code: ErrorCode::Numeric(-1121),
            message: "Invalid symbol.".to_string(),
            http_status: 400,
        };
        assert_eq!(
            err.to_string(),
            "Binance API error [-1121] Invalid symbol. (HTTP 400)"
        );
    }

    #[test]
    fn test_classified_error_converts_to_api_error() {
        let classified = ClassifiedError::Fallback(ClassificationFallbackError {
            exchange: Exchange::Coinone,
            http_status: 502,
            message: "Failed to parse error response: unexpected end of input".to_string(),
        });
        let api: ApiError = classified.into();
        assert!(matches!(api, ApiError::ClassificationFallback(_)));
        assert_eq!(api.exchange(), Exchange::Coinone);
    }
}
