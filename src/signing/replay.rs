//! Replay-protection tokens
//!
//! Coinone expects a unique nonce per private request; Binance expects a
//! millisecond timestamp plus the receive window the server may accept it in.
//! Tokens are generated right before signing and never reused.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayToken {
    Nonce(String),
    Timestamp { timestamp_ms: i64, recv_window_ms: u64 },
}

impl ReplayToken {
    /// Fresh UUID v4 nonce
    pub fn nonce() -> Self {
        ReplayToken::Nonce(Uuid::new_v4().to_string())
    }

    /// Current wall-clock timestamp with the given receive window
    pub fn timestamp(recv_window_ms: u64) -> Self {
        ReplayToken::Timestamp {
            timestamp_ms: Utc::now().timestamp_millis(),
            recv_window_ms,
        }
    }

    /// Request fields this token contributes, as sent on the wire
    pub fn fields(&self) -> Vec<(&'static str, Value)> {
        match self {
            ReplayToken::Nonce(nonce) => vec![("nonce", Value::String(nonce.clone()))],
            ReplayToken::Timestamp {
                timestamp_ms,
                recv_window_ms,
            } => vec![
                ("recvWindow", Value::from(*recv_window_ms)),
                ("timestamp", Value::from(*timestamp_ms)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_unique() {
        assert_ne!(ReplayToken::nonce(), ReplayToken::nonce());
    }

    #[test]
    fn test_timestamp_fields() {
        let token = ReplayToken::Timestamp {
            timestamp_ms: 1_499_827_319_559,
            recv_window_ms: 5000,
        };
        let fields = token.fields();
        assert_eq!(fields[0], ("recvWindow", Value::from(5000u64)));
        assert_eq!(fields[1], ("timestamp", Value::from(1_499_827_319_559i64)));
    }

    #[test]
    fn test_timestamp_is_current() {
        let before = Utc::now().timestamp_millis();
        match ReplayToken::timestamp(5000) {
            ReplayToken::Timestamp { timestamp_ms, .. } => assert!(timestamp_ms >= before),
            other => panic!("unexpected token {:?}", other),
        }
    }
}
