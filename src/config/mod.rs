//! Configuration management for coinbridge
//!
//! Loads from YAML files + environment variables via .env

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::signing::SignatureAlgorithm;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub coinone: CoinoneConfig,
    pub binance: BinanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Deserialize)]
pub struct CoinoneConfig {
    /// Base URL for public (ticker) endpoints
    pub public_url: String,
    /// Base URL for private (account) endpoints
    pub private_url: String,
    pub access_token: String,
    pub secret_key: String,
    /// HmacSHA512 for Coinone
    pub signature_algorithm: SignatureAlgorithm,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

#[derive(Clone, Deserialize)]
pub struct BinanceConfig {
    pub base_url: String,
    /// API key, sent as X-MBX-APIKEY
    pub access_token: String,
    pub secret_key: String,
    /// HmacSHA256 for Binance
    pub signature_algorithm: SignatureAlgorithm,
    /// Validity window sent with every signed request
    pub recv_window_ms: u64,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (e.g. "info", "coinbridge=debug")
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Connect and read timeouts of an exchange HTTP client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl CoinoneConfig {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            read: Duration::from_millis(self.read_timeout_ms),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.secret_key.trim().is_empty()
    }
}

impl BinanceConfig {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            read: Duration::from_millis(self.read_timeout_ms),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.secret_key.trim().is_empty()
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::defaults()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (COINBRIDGE__*)
            .add_source(Environment::with_prefix("COINBRIDGE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            // Coinone defaults
            .set_default("coinone.public_url", "https://api.coinone.co.kr/public/v2")?
            .set_default("coinone.private_url", "https://api.coinone.co.kr/v2.1")?
            .set_default("coinone.access_token", "")?
            .set_default("coinone.secret_key", "")?
            .set_default("coinone.signature_algorithm", "HmacSHA512")?
            .set_default("coinone.connect_timeout_ms", 10_000)?
            .set_default("coinone.read_timeout_ms", 30_000)?
            // Binance defaults
            .set_default("binance.base_url", "https://api.binance.com")?
            .set_default("binance.access_token", "")?
            .set_default("binance.secret_key", "")?
            .set_default("binance.signature_algorithm", "HmacSHA256")?
            .set_default("binance.recv_window_ms", 5_000)?
            .set_default("binance.connect_timeout_ms", 10_000)?
            .set_default("binance.read_timeout_ms", 30_000)?
            // Logging defaults
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?)
    }

    /// Reject settings no client could work with
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("coinone.public_url", &self.coinone.public_url),
            ("coinone.private_url", &self.coinone.private_url),
            ("binance.base_url", &self.binance.base_url),
        ];
        for (key, value) in urls {
            if value.trim().is_empty() {
                bail!("{} must not be empty", key);
            }
            url::Url::parse(value).with_context(|| format!("{} is not a valid URL", key))?;
        }

        let timeouts = [
            ("coinone.connect_timeout_ms", self.coinone.connect_timeout_ms),
            ("coinone.read_timeout_ms", self.coinone.read_timeout_ms),
            ("binance.connect_timeout_ms", self.binance.connect_timeout_ms),
            ("binance.read_timeout_ms", self.binance.read_timeout_ms),
            ("binance.recv_window_ms", self.binance.recv_window_ms),
        ];
        for (key, value) in timeouts {
            if value == 0 {
                bail!("{} must be greater than zero", key);
            }
        }

        Ok(())
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "coinone={} ({}, creds={}) binance={} ({}, creds={}, recv_window={}ms) log={}",
            self.coinone.public_url,
            self.coinone.signature_algorithm,
            self.coinone.has_credentials(),
            self.binance.base_url,
            self.binance.signature_algorithm,
            self.binance.has_credentials(),
            self.binance.recv_window_ms,
            self.logging.level
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

// Secrets never reach Debug output

impl std::fmt::Debug for CoinoneConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinoneConfig")
            .field("public_url", &self.public_url)
            .field("private_url", &self.private_url)
            .field("access_token", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("signature_algorithm", &self.signature_algorithm)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .finish()
    }
}

impl std::fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("signature_algorithm", &self.signature_algorithm)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .finish()
    }
}
