//! Coinone error shape: `{"result": "error", "error_code": "..", "error_msg": ".."}`

use super::{
    fallback, scan_discriminator, scan_fields, ErrorClassifier, RawResponse, UNKNOWN_ERROR_MESSAGE,
};
use crate::error::{ClassifiedError, ErrorCode, ExchangeError};
use crate::types::Exchange;

const RESULT_FIELD: &str = "result";
const ERROR_RESULT: &str = "error";
const CODE_FIELD: &str = "error_code";
const MESSAGE_FIELD: &str = "error_msg";

#[derive(Debug, Clone, Copy, Default)]
pub struct CoinoneClassifier;

impl ErrorClassifier for CoinoneClassifier {
    fn exchange(&self) -> Exchange {
        Exchange::Coinone
    }

    fn has_error(&self, response: &RawResponse) -> bool {
        if response.is_http_error() {
            return true;
        }
        scan_discriminator(&response.body, RESULT_FIELD, |value| {
            Ok(value.text() == ERROR_RESULT)
        })
        .unwrap_or_else(|e| {
            tracing::debug!(exchange = "coinone", error = %e, "Unreadable body treated as success");
            false
        })
    }

    fn classify(&self, response: &RawResponse) -> ClassifiedError {
        match scan_fields(&response.body, CODE_FIELD, MESSAGE_FIELD) {
            Ok((code, message)) => ClassifiedError::Exchange(ExchangeError {
                exchange: Exchange::Coinone,
                code: ErrorCode::Text(
                    code.map(|c| c.text())
                        .unwrap_or_else(|| response.status.to_string()),
                ),
                message: message
                    .map(|m| m.text())
                    .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
                http_status: response.status,
            }),
            Err(e) => fallback(Exchange::Coinone, response, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_error_in_200_is_error() {
        let response = RawResponse::new(
            200,
            r#"{"result":"error","error_code":"107","error_msg":"Parameter error"}"#,
        );
        assert!(CoinoneClassifier.has_error(&response));

        match CoinoneClassifier.classify(&response) {
            ClassifiedError::Exchange(e) => {
                assert_eq!(e.code, ErrorCode::Text("107".to_string()));
                assert_eq!(e.message, "Parameter error");
                assert_eq!(e.http_status, 200);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_success_body_is_not_error() {
        let response = RawResponse::new(
            200,
            r#"{"result":"success","error_code":"0","tickers":[{"last":"1"}]}"#,
        );
        assert!(!CoinoneClassifier.has_error(&response));
    }

    #[test]
    fn test_unreadable_200_fails_open() {
        assert!(!CoinoneClassifier.has_error(&RawResponse::new(200, "{invalid json}")));
        assert!(!CoinoneClassifier.has_error(&RawResponse::new(200, "")));
        assert!(!CoinoneClassifier.has_error(&RawResponse::new(200, "<html>")));
    }

    #[test]
    fn test_numeric_code_is_kept_as_text() {
        let response = RawResponse::new(400, r#"{"error_msg":"bad","error_code":4}"#);
        match CoinoneClassifier.classify(&response) {
            ClassifiedError::Exchange(e) => assert_eq!(e.code, ErrorCode::Text("4".to_string())),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let response = RawResponse::new(502, r#"{"result":"error"}"#);
        match CoinoneClassifier.classify(&response) {
            ClassifiedError::Exchange(e) => {
                assert_eq!(e.code, ErrorCode::Text("502".to_string()));
                assert_eq!(e.message, UNKNOWN_ERROR_MESSAGE);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_error_body_fails_closed() {
        let response = RawResponse::new(503, "Service Unavailable");
        assert!(CoinoneClassifier.has_error(&response));
        match CoinoneClassifier.classify(&response) {
            ClassifiedError::Fallback(e) => {
                assert_eq!(e.http_status, 503);
                assert!(e.message.starts_with("Failed to parse error response: "));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
