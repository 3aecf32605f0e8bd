//! Stripe payment provider implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::CoreConfig;
use crate::error::TagError;
use crate::provider::PaymentProvider;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe payment provider
#[derive(Clone)]
pub struct StripeProvider {
    client: Client,
    config: CoreConfig,
}

impl StripeProvider {
    /// Create a new Stripe provider
    pub fn new(config: CoreConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    /// Make authenticated request to Stripe
    async fn stripe_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
    ) -> Result<T, TagError> {
        let url = format!("{STRIPE_API_BASE}{endpoint}");

        let response = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.stripe_secret_key, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Stripe API request failed");
                TagError::Upstream(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Stripe API error");
            return Err(TagError::Upstream(format!("Stripe API error: {status}")));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Stripe response");
            TagError::Internal(e.to_string())
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    #[instrument(skip(self))]
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, TagError> {
        debug!(subscription_id = %subscription_id, "Getting Stripe subscription");

        self.stripe_request::<StripeSubscription>(
            reqwest::Method::GET,
            &format!("/subscriptions/{subscription_id}"),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), TagError> {
        debug!(subscription_id = %subscription_id, "Canceling subscription");

        let _: StripeSubscription = self
            .stripe_request(
                reqwest::Method::DELETE,
                &format!("/subscriptions/{subscription_id}"),
            )
            .await?;

        Ok(())
    }
}

// Stripe API response types

/// Stripe subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeSubscription {
    /// Subscription ID
    pub id: String,
    /// Subscription status
    pub status: String,
    /// Current period start (Unix timestamp)
    pub current_period_start: i64,
    /// Current period end (Unix timestamp)
    pub current_period_end: i64,
    /// Whether subscription cancels at period end
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

/// Stripe invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeInvoice {
    /// Invoice ID
    pub id: String,
    /// Invoice status
    pub status: Option<String>,
    /// Why this invoice was issued
    pub billing_reason: Option<String>,
    /// Payment intent that charged it
    pub payment_intent: Option<String>,
    /// Subscription it bills for
    pub subscription: Option<String>,
    /// Amount due in cents
    pub amount_due: i64,
    /// Amount paid in cents
    pub amount_paid: i64,
    /// Currency
    pub currency: String,
}
