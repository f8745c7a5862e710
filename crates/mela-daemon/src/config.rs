//! Configuration for the daemon

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Payment gateway configuration
    #[serde(default)]
    pub payments: PaymentsConfig,

    /// SMS provider configuration
    #[serde(default)]
    pub sms: SmsConfig,

    /// Session configuration
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".parse().expect("static addr"),
            enable_cors: true,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    Memory {
        /// Install the demo categories, problem tree, and grocery shelf
        #[serde(default = "default_true")]
        seed_demo_data: bool,
    },

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory {
            seed_demo_data: true,
        }
    }
}

/// Payment gateway configuration
///
/// `key_secret` signs the sync confirmation path; `webhook_secret` signs the
/// webhook path. Both stay server-side. With `sandbox` set (or no key id)
/// gateway orders are fabricated locally and no network call is made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_gateway_url")]
    pub api_url: String,

    #[serde(default)]
    pub key_id: String,

    #[serde(default)]
    pub key_secret: String,

    #[serde(default)]
    pub webhook_secret: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Gateway request timeout in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub sandbox: bool,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            api_url: default_gateway_url(),
            key_id: String::new(),
            key_secret: String::new(),
            webhook_secret: String::new(),
            currency: default_currency(),
            timeout_secs: default_gateway_timeout(),
            sandbox: true,
        }
    }
}

/// SMS provider configuration; disabled means log-only delivery
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_sms_url")]
    pub base_url: String,

    #[serde(default)]
    pub account_sid: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_secret: String,

    #[serde(default)]
    pub from_number: String,

    #[serde(default = "default_sms_timeout")]
    pub timeout_secs: u64,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions expire after this many hours
    #[serde(default = "default_session_ttl")]
    pub ttl_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_session_ttl(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_gateway_url() -> String {
    "https://api.razorpay.com".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_sms_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_sms_timeout() -> u64 {
    10
}

fn default_session_ttl() -> u64 {
    24 * 7
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file, and `MELA_*`
    /// environment variables, in that order of precedence.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MELA")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(matches!(config.storage, StorageConfig::Memory { .. }));
        assert!(config.payments.sandbox);
        assert_eq!(config.payments.currency, "INR");
    }

    #[test]
    fn test_session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.ttl_hours, 168);
    }
}
