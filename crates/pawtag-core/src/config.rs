//! Core service configuration

/// Configuration shared by the reconciliation engine and external clients
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Notification gateway base URL
    pub notify_base_url: String,
    /// Notification gateway API token
    pub notify_token: String,
}

impl CoreConfig {
    /// Create a new core config
    pub fn new(
        stripe_secret_key: impl Into<String>,
        stripe_webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            stripe_secret_key: stripe_secret_key.into(),
            stripe_webhook_secret: stripe_webhook_secret.into(),
            notify_base_url: "https://gateway.example.com".to_string(),
            notify_token: String::new(),
        }
    }

    /// Set the notification gateway endpoint
    pub fn with_notifier(
        mut self,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.notify_base_url = base_url.into();
        self.notify_token = token.into();
        self
    }
}
