//! Payment provider abstraction
//!
//! Abstracts the payment processor so the confirmation flow can be
//! exercised with a fake in tests.

use async_trait::async_trait;

use crate::stripe::StripeSubscription;
use crate::TagError;

/// Payment provider trait
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch a subscription object from the processor
    async fn get_subscription(&self, subscription_id: &str)
        -> Result<StripeSubscription, TagError>;

    /// Cancel a subscription at the processor
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), TagError>;
}
