//! Configuration for the Tag API service.

use pawtag_core::CoreConfig;
use std::time::Duration;

/// Tag API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Core configuration (Stripe keys, notification gateway)
    pub core: CoreConfig,
    /// Bearer token for operator endpoints
    pub admin_token: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Database
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        // Server port
        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Stripe configuration
        let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| ConfigError::Missing("STRIPE_SECRET_KEY"))?;

        let stripe_webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?;

        // Notification gateway
        let notify_base_url = std::env::var("NOTIFY_BASE_URL")
            .map_err(|_| ConfigError::Missing("NOTIFY_BASE_URL"))?;

        let notify_token =
            std::env::var("NOTIFY_TOKEN").map_err(|_| ConfigError::Missing("NOTIFY_TOKEN"))?;

        // Operator access
        let admin_token =
            std::env::var("ADMIN_TOKEN").map_err(|_| ConfigError::Missing("ADMIN_TOKEN"))?;
        if admin_token.len() < 16 {
            return Err(ConfigError::Invalid("ADMIN_TOKEN"));
        }

        // Request timeout
        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        // Metrics
        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let core = CoreConfig::new(stripe_secret_key, stripe_webhook_secret)
            .with_notifier(notify_base_url, notify_token);

        Ok(Self {
            http_port,
            database_url,
            core,
            admin_token,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
