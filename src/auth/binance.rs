//! Binance request authentication
//!
//! Binance signs a query-style canonical string: sorted `key=value` pairs
//! covering every parameter sent, replay fields (`recvWindow`, `timestamp`)
//! included. GET and POST take different paths:
//!
//! - GET: the sorted query string is signed and `&signature=` is appended.
//! - POST: the JSON body is buffered, parsed into a sorted map, rendered as
//!   `key=value&...`, signed, and the `signature` field is written back into
//!   the JSON that is actually sent.
//!
//! `X-MBX-APIKEY` is attached to every private request.

use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::Value;

use super::{insert_header, OutboundRequest, RequestAuthenticator, SignedRequest};
use crate::config::BinanceConfig;
use crate::error::{AuthError, SigningError};
use crate::signing::{
    body_canonical, body_parameters, encode_body, query_string, render_value, sign,
    ReplayToken, SignatureAlgorithm,
};
use crate::types::Exchange;

pub const API_KEY_HEADER: &str = "x-mbx-apikey";
pub const SIGNATURE_FIELD: &str = "signature";

#[derive(Clone)]
pub struct BinanceAuthenticator {
    api_key: String,
    secret_key: String,
    algorithm: SignatureAlgorithm,
    recv_window_ms: u64,
}

impl BinanceAuthenticator {
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        algorithm: SignatureAlgorithm,
        recv_window_ms: u64,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            algorithm,
            recv_window_ms,
        }
    }

    pub fn from_config(config: &BinanceConfig) -> Self {
        Self::new(
            config.access_token.clone(),
            config.secret_key.clone(),
            config.signature_algorithm,
            config.recv_window_ms,
        )
    }

    /// Signed query string: sorted params plus replay fields, then `&signature=`.
    pub fn sign_query(
        &self,
        mut params: BTreeMap<String, String>,
        token: &ReplayToken,
    ) -> Result<String, SigningError> {
        for (key, value) in token.fields() {
            params.insert(key.to_string(), render_value(&value));
        }
        params.remove(SIGNATURE_FIELD);

        let query = query_string(&params);
        let signature = sign(&self.secret_key, query.as_bytes(), self.algorithm)?;
        Ok(format!("{}&{}={}", query, SIGNATURE_FIELD, signature))
    }

    /// Signed JSON body.
    ///
    /// Query parameters are folded into the body so the signature covers
    /// every field that is sent.
    pub fn sign_body(
        &self,
        body: &[u8],
        query: &BTreeMap<String, String>,
        token: &ReplayToken,
    ) -> Result<Vec<u8>, AuthError> {
        let mut fields = body_parameters(body)?;
        for (key, value) in query {
            fields
                .entry(key.clone())
                .or_insert_with(|| Value::String(value.clone()));
        }
        for (key, value) in token.fields() {
            fields.insert(key.to_string(), value);
        }
        fields.remove(SIGNATURE_FIELD);

        let canonical = body_canonical(&fields);
        let signature = sign(&self.secret_key, canonical.as_bytes(), self.algorithm)?;
        fields.insert(SIGNATURE_FIELD.to_string(), Value::String(signature));

        Ok(encode_body(&fields)?)
    }

    /// Authenticate with a caller-supplied replay token
    pub fn authenticate_with(
        &self,
        request: OutboundRequest,
        token: &ReplayToken,
    ) -> Result<SignedRequest, AuthError> {
        let mut headers = reqwest::header::HeaderMap::new();
        insert_header(&mut headers, API_KEY_HEADER, &self.api_key)?;

        if request.method == Method::POST {
            let body = self.sign_body(
                request.body.as_deref().unwrap_or_default(),
                &request.query,
                token,
            )?;
            return Ok(SignedRequest {
                method: request.method,
                path: request.path,
                query: None,
                headers,
                body: Some(body),
            });
        }

        let query = self.sign_query(request.query, token)?;
        Ok(SignedRequest {
            method: request.method,
            path: request.path,
            query: Some(query),
            headers,
            body: request.body,
        })
    }
}

impl RequestAuthenticator for BinanceAuthenticator {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn authenticate(&self, request: OutboundRequest) -> Result<SignedRequest, AuthError> {
        self.authenticate_with(request, &ReplayToken::timestamp(self.recv_window_ms))
    }
}

impl std::fmt::Debug for BinanceAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceAuthenticator")
            .field("algorithm", &self.algorithm)
            .field("recv_window_ms", &self.recv_window_ms)
            .finish_non_exhaustive()
    }
}
