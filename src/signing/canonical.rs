//! Request canonicalization
//!
//! Turns request parameters into the exact byte sequence that gets signed.
//!
//! - Payload style (Coinone): Base64 of the raw JSON body that goes on the wire.
//! - Query style (Binance): `key=value` pairs, keys ascending, joined by `&`.
//!   For POST bodies the JSON object is first parsed into a sorted map, so
//!   field order in the caller's body never changes the signature.

use std::collections::BTreeMap;

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Base64 text of the outgoing body; Coinone signs this, not the raw JSON.
pub fn payload_canonical(body: &[u8]) -> String {
    general_purpose::STANDARD.encode(body)
}

/// Render URL query parameters in sorted-key order with form-urlencoded values.
///
/// The returned string is both the signed material and the query sent.
pub fn query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", form_encode(key), form_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse a JSON request body into a sorted key/value map.
///
/// An empty (or whitespace-only) body yields an empty map. Numbers keep
/// their exact source text, so `0.10` or integers wider than `u64` are
/// signed and re-sent unchanged.
pub fn body_parameters(body: &[u8]) -> Result<BTreeMap<String, Value>, CanonicalizationError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(BTreeMap::new());
    }

    match serde_json::from_slice::<Value>(body).map_err(CanonicalizationError::InvalidJson)? {
        Value::Object(fields) => Ok(fields.into_iter().collect()),
        _ => Err(CanonicalizationError::NotAnObject),
    }
}

/// Canonical `key=value&...` form of body fields (keys ascending, raw values).
pub fn body_canonical(fields: &BTreeMap<String, Value>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, render_value(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Serialize body fields back to the JSON bytes that are transmitted.
pub fn encode_body(fields: &BTreeMap<String, Value>) -> Result<Vec<u8>, CanonicalizationError> {
    serde_json::to_vec(fields).map_err(CanonicalizationError::Serialize)
}

/// Raw text of a JSON value as it appears in a canonical string
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        // Numbers, booleans, null and nested containers keep their JSON text
        other => other.to_string(),
    }
}

fn form_encode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}
