//! Configuration management for the entry pass service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The resulting [`Config`] is built once at startup and handed to the
//! store, gateway and server constructors.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// `PostgreSQL` configuration
    pub database: DatabaseConfig,
    /// Messaging provider configuration
    pub notification: NotificationConfig,
    /// Share link configuration
    pub share: ShareConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; the in-memory store is used when absent
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Messaging (WhatsApp over Twilio) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Twilio account SID
    pub account_sid: Option<String>,
    /// Twilio auth token
    pub auth_token: Option<String>,
    /// Sender number registered for WhatsApp
    pub sender_number: Option<String>,
    /// Provider API base URL
    pub api_base_url: String,
    /// Country code prefixed to local numbers (e.g., "+225")
    pub default_country_code: String,
    /// Currency label used in messages
    pub currency_label: String,
    /// Upper bound on a single delivery attempt, in seconds
    pub timeout_secs: u64,
}

impl NotificationConfig {
    /// Returns `true` when account, token and sender are all present
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.sender_number.is_some()
    }

    /// Delivery timeout as a `Duration`
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            sender_number: None,
            api_base_url: "https://api.twilio.com/2010-04-01".to_string(),
            default_country_code: "+225".to_string(),
            currency_label: "FCFA".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Share link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Public frontend URL event pages live under
    pub frontend_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:4200".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unparseable numeric values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let notification_defaults = NotificationConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3000),
                metrics_host: env::var("METRICS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                metrics_port: env::var("METRICS_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(9090),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
                connect_timeout: env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            notification: NotificationConfig {
                account_sid: env::var("TWILIO_ACCOUNT_SID").ok(),
                auth_token: env::var("TWILIO_AUTH_TOKEN").ok(),
                sender_number: env::var("TWILIO_WHATSAPP_NUMBER").ok(),
                api_base_url: env::var("TWILIO_API_BASE_URL")
                    .unwrap_or(notification_defaults.api_base_url),
                default_country_code: env::var("DEFAULT_COUNTRY_CODE")
                    .unwrap_or(notification_defaults.default_country_code),
                currency_label: env::var("CURRENCY_LABEL")
                    .unwrap_or(notification_defaults.currency_label),
                timeout_secs: env::var("NOTIFICATION_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(notification_defaults.timeout_secs),
            },
            share: ShareConfig {
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| ShareConfig::default().frontend_url),
            },
        }
    }

    /// Socket address string the HTTP server binds to
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
