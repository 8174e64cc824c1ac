//! Binance error shape: `{"code": <non-zero int>, "msg": ".."}`
//!
//! Successful responses carry no `code` at all, or `code: 0`. A `code` that
//! is not an integer is a scan error, so it fails open in `has_error` and
//! falls back in `classify`.

use super::{
    fallback, scan_discriminator, scan_fields, ErrorClassifier, RawResponse, ScanError,
    UNKNOWN_ERROR_MESSAGE,
};
use crate::error::{ClassifiedError, ErrorCode, ExchangeError};
use crate::types::Exchange;

const CODE_FIELD: &str = "code";
const MESSAGE_FIELD: &str = "msg";

#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceClassifier;

impl BinanceClassifier {
    fn read(&self, response: &RawResponse) -> Result<ExchangeError, ScanError> {
        let (code, message) = scan_fields(&response.body, CODE_FIELD, MESSAGE_FIELD)?;
        let code = match code {
            Some(code) => code.as_i64()?,
            None => i64::from(response.status),
        };
        Ok(ExchangeError {
            exchange: Exchange::Binance,
            code: ErrorCode::Numeric(code),
            message: message
                .map(|m| m.text())
                .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
            http_status: response.status,
        })
    }
}

impl ErrorClassifier for BinanceClassifier {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn has_error(&self, response: &RawResponse) -> bool {
        if response.is_http_error() {
            return true;
        }
        scan_discriminator(&response.body, CODE_FIELD, |value| Ok(value.as_i64()? != 0))
            .unwrap_or_else(|e| {
                tracing::debug!(exchange = "binance", error = %e, "Unreadable body treated as success");
                false
            })
    }

    fn classify(&self, response: &RawResponse) -> ClassifiedError {
        match self.read(response) {
            Ok(error) => ClassifiedError::Exchange(error),
            Err(e) => fallback(Exchange::Binance, response, &e),
        }
    }
}
