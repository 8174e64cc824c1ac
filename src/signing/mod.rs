//! HMAC request signing
//!
//! Both exchanges sign with an HMAC keyed by the UTF-8 bytes of the API
//! secret and send the digest as lowercase hex. Binance uses SHA-256 over
//! its query-style canonical string, Coinone uses SHA-512 over the Base64
//! encoded request body.

pub mod canonical;
pub mod replay;

pub use canonical::*;
pub use replay::ReplayToken;

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Sha256, Sha512};

use crate::error::SigningError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// HMAC digest used for request signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum SignatureAlgorithm {
    HmacSha256,
    HmacSha512,
}

impl FromStr for SignatureAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmacsha256" | "hmac-sha256" | "sha256" => Ok(SignatureAlgorithm::HmacSha256),
            "hmacsha512" | "hmac-sha512" | "sha512" => Ok(SignatureAlgorithm::HmacSha512),
            _ => Err(SigningError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for SignatureAlgorithm {
    type Error = SigningError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithm::HmacSha256 => write!(f, "HmacSHA256"),
            SignatureAlgorithm::HmacSha512 => write!(f, "HmacSHA512"),
        }
    }
}

/// Compute `HMAC(secret_key, data)` and render it as lowercase hex.
///
/// Deterministic and side-effect free. Fails only when the key is empty.
pub fn sign(
    secret_key: &str,
    data: &[u8],
    algorithm: SignatureAlgorithm,
) -> Result<String, SigningError> {
    if secret_key.is_empty() {
        return Err(SigningError::MissingSecretKey);
    }

    let digest = match algorithm {
        SignatureAlgorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
                .map_err(|_| SigningError::InvalidKey)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        SignatureAlgorithm::HmacSha512 => {
            let mut mac = HmacSha512::new_from_slice(secret_key.as_bytes())
                .map_err(|_| SigningError::InvalidKey)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    };

    Ok(hex::encode(digest))
}
