//! Coinone request authentication
//!
//! Coinone signs the Base64 of the JSON body (payload style). The body
//! gains `access_token` and a fresh UUID `nonce`, is serialized once, and
//! those exact bytes are both transmitted and Base64-encoded into
//! `X-COINONE-PAYLOAD`. `X-COINONE-SIGNATURE` is the HMAC of that Base64 text.

use serde_json::Value;

use super::{insert_header, OutboundRequest, RequestAuthenticator, SignedRequest};
use crate::config::CoinoneConfig;
use crate::error::{AuthError, SigningError};
use crate::signing::{
    body_parameters, encode_body, payload_canonical, query_string, sign, ReplayToken,
    SignatureAlgorithm,
};
use crate::types::Exchange;

pub const PAYLOAD_HEADER: &str = "x-coinone-payload";
pub const SIGNATURE_HEADER: &str = "x-coinone-signature";

#[derive(Clone)]
pub struct CoinoneAuthenticator {
    access_token: String,
    secret_key: String,
    algorithm: SignatureAlgorithm,
}

impl CoinoneAuthenticator {
    pub fn new(
        access_token: impl Into<String>,
        secret_key: impl Into<String>,
        algorithm: SignatureAlgorithm,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            secret_key: secret_key.into(),
            algorithm,
        }
    }

    pub fn from_config(config: &CoinoneConfig) -> Self {
        Self::new(
            config.access_token.clone(),
            config.secret_key.clone(),
            config.signature_algorithm,
        )
    }

    /// Payload header value and signature for an already-final body
    pub fn sign_payload(&self, body: &[u8]) -> Result<(String, String), SigningError> {
        let payload = payload_canonical(body);
        let signature = sign(&self.secret_key, payload.as_bytes(), self.algorithm)?;
        Ok((payload, signature))
    }

    /// Authenticate with a caller-supplied replay token
    pub fn authenticate_with(
        &self,
        request: OutboundRequest,
        token: &ReplayToken,
    ) -> Result<SignedRequest, AuthError> {
        let mut fields = body_parameters(request.body.as_deref().unwrap_or_default())?;
        fields.insert(
            "access_token".to_string(),
            Value::String(self.access_token.clone()),
        );
        for (key, value) in token.fields() {
            fields.insert(key.to_string(), value);
        }

        let body = encode_body(&fields)?;
        let (payload, signature) = self.sign_payload(&body)?;

        let mut headers = reqwest::header::HeaderMap::new();
        insert_header(&mut headers, PAYLOAD_HEADER, &payload)?;
        insert_header(&mut headers, SIGNATURE_HEADER, &signature)?;

        let query = if request.query.is_empty() {
            None
        } else {
            Some(query_string(&request.query))
        };

        Ok(SignedRequest {
            method: request.method,
            path: request.path,
            query,
            headers,
            body: Some(body),
        })
    }
}

impl RequestAuthenticator for CoinoneAuthenticator {
    fn exchange(&self) -> Exchange {
        Exchange::Coinone
    }

    fn authenticate(&self, request: OutboundRequest) -> Result<SignedRequest, AuthError> {
        self.authenticate_with(request, &ReplayToken::nonce())
    }
}

impl std::fmt::Debug for CoinoneAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinoneAuthenticator")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
