//! Exchange error classification
//!
//! Exchanges report some failures inside HTTP 200 bodies, so every response
//! passes through two phases:
//!
//! 1. `has_error` - cheap check. HTTP 4xx/5xx, or the exchange's
//!    discriminator field says error. Scans top-level fields only and stops
//!    at the first hit. Anything unparsable is treated as "no error".
//! 2. `classify` - runs only when `has_error` said yes. Scans the whole
//!    top-level object for code and message. Anything unparsable becomes a
//!    [`ClassificationFallbackError`] carrying the HTTP status.
//!
//! The first phase fails open and the second fails closed.

pub mod binance;
pub mod coinone;
pub mod scanner;

pub use binance::BinanceClassifier;
pub use coinone::CoinoneClassifier;
pub use scanner::{JsonScanner, Scalar, ScanError, Token};

use crate::error::{ClassificationFallbackError, ClassifiedError};
use crate::types::Exchange;

/// Message used when an error body has no message field
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// HTTP status and undecoded body of an exchange response.
///
/// The body is fully buffered; the scanner's early exit bounds parsing work only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_http_error(&self) -> bool {
        (400..600).contains(&self.status)
    }
}

pub trait ErrorClassifier: Send + Sync {
    fn exchange(&self) -> Exchange;

    /// Whether the response is a failure. Never fails; unparsable means `false`.
    fn has_error(&self, response: &RawResponse) -> bool;

    /// Build the error for a response `has_error` flagged.
    fn classify(&self, response: &RawResponse) -> ClassifiedError;
}

impl Exchange {
    /// Error classifier for this exchange's response shapes
    pub fn classifier(&self) -> &'static dyn ErrorClassifier {
        match self {
            Exchange::Coinone => &CoinoneClassifier,
            Exchange::Binance => &BinanceClassifier,
        }
    }
}

/// Walk top-level fields until `key` is found and hand its value to `decide`.
///
/// `Ok(false)` when the body is empty, not an object, or lacks `key`.
pub(crate) fn scan_discriminator<F>(body: &[u8], key: &str, decide: F) -> Result<bool, ScanError>
where
    F: FnOnce(Scalar) -> Result<bool, ScanError>,
{
    let mut scanner = JsonScanner::new(body);
    if !scanner.begin_object()? {
        return Ok(false);
    }
    while let Some(field) = scanner.next_key()? {
        if field == key {
            return decide(scanner.read_scalar()?);
        }
        scanner.skip_value()?;
    }
    Ok(false)
}

/// Scan the whole top-level object and capture two fields in any order.
///
/// `null` values count as absent.
pub(crate) fn scan_fields(
    body: &[u8],
    code_key: &str,
    message_key: &str,
) -> Result<(Option<Scalar>, Option<Scalar>), ScanError> {
    let mut scanner = JsonScanner::new(body);
    if !scanner.begin_object()? {
        return Err(ScanError::NotAnObject);
    }

    let mut code = None;
    let mut message = None;
    while let Some(field) = scanner.next_key()? {
        if field == code_key {
            code = non_null(scanner.read_scalar()?);
        } else if field == message_key {
            message = non_null(scanner.read_scalar()?);
        } else {
            scanner.skip_value()?;
        }
    }
    Ok((code, message))
}

fn non_null(value: Scalar) -> Option<Scalar> {
    match value {
        Scalar::Null => None,
        other => Some(other),
    }
}

/// Fail-closed result for a body `classify` could not read
pub(crate) fn fallback(
    exchange: Exchange,
    response: &RawResponse,
    reason: &ScanError,
) -> ClassifiedError {
    tracing::warn!(
        exchange = %exchange,
        status = response.status,
        error = %reason,
        "Could not parse error response"
    );
    ClassifiedError::Fallback(ClassificationFallbackError {
        exchange,
        http_status: response.status,
        message: format!("Failed to parse error response: {}", reason),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_range() {
        assert!(RawResponse::new(400, "").is_http_error());
        assert!(RawResponse::new(503, "").is_http_error());
        assert!(!RawResponse::new(200, "").is_http_error());
        assert!(!RawResponse::new(302, "").is_http_error());
    }

    #[test]
    fn test_scan_discriminator_stops_at_first_hit() {
        let body = br#"{"rows": [{"result": "error"}], "result": "success", "x": ]]]"#;
        let hit = scan_discriminator(body, "result", |v| Ok(v.text() == "error")).unwrap();
        assert!(!hit);
    }

    #[test]
    fn test_scan_fields_any_order() {
        let (code, msg) = scan_fields(br#"{"msg": "m", "other": {}, "code": 3}"#, "code", "msg").unwrap();
        assert_eq!(code, Some(Scalar::Number("3".to_string())));
        assert_eq!(msg, Some(Scalar::String("m".to_string())));
    }

    #[test]
    fn test_scan_fields_rejects_non_object() {
        assert!(matches!(
            scan_fields(b"[]", "code", "msg"),
            Err(ScanError::NotAnObject)
        ));
        assert!(matches!(
            scan_fields(b"", "code", "msg"),
            Err(ScanError::NotAnObject)
        ));
    }

    #[test]
    fn test_classifier_dispatch() {
        for exchange in Exchange::ALL {
            assert_eq!(exchange.classifier().exchange(), exchange);
        }
    }
}
