//! Notification gateway abstraction
//!
//! Sends are always fire-and-forget relative to ledger mutations: callers
//! log failures and never unwind a committed state transition over them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

use pawtag_types::{PlanType, UserId};

use crate::error::TagError;

/// Delivery method for finder location shares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    /// Plain SMS
    Sms,
    /// WhatsApp message
    Whatsapp,
}

impl DeliveryMethod {
    /// Gateway channel name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl std::str::FromStr for DeliveryMethod {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Self::Sms),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(TagError::InvalidInput(format!(
                "unknown delivery method: {other}"
            ))),
        }
    }
}

/// Notification gateway trait
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell a user their subscription renewed
    async fn send_renewal_notice(
        &self,
        user_id: UserId,
        plan: PlanType,
        end_date: DateTime<Utc>,
    ) -> Result<(), TagError>;

    /// Tell a user a charge failed (the processor will retry)
    async fn send_payment_failed_notice(&self, user_id: UserId) -> Result<(), TagError>;

    /// Send a finder's location to the owner's phone
    async fn send_location_share(
        &self,
        phone: &str,
        method: DeliveryMethod,
        location: &str,
    ) -> Result<(), TagError>;
}

/// HTTP notification gateway client
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpNotifier {
    /// Create a new gateway client
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), TagError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Notification gateway request failed");
                TagError::Upstream(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(status = %status, "Notification gateway error");
            return Err(TagError::Upstream(format!("gateway error: {status}")));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_renewal_notice(
        &self,
        user_id: UserId,
        plan: PlanType,
        end_date: DateTime<Utc>,
    ) -> Result<(), TagError> {
        debug!(user_id = %user_id, plan = %plan, "Sending renewal notice");

        self.post(
            "/v1/messages/renewal",
            &serde_json::json!({
                "user_id": user_id,
                "plan": plan,
                "covered_until": end_date.to_rfc3339(),
            }),
        )
        .await
    }

    async fn send_payment_failed_notice(&self, user_id: UserId) -> Result<(), TagError> {
        debug!(user_id = %user_id, "Sending payment failed notice");

        self.post(
            "/v1/messages/payment-failed",
            &serde_json::json!({ "user_id": user_id }),
        )
        .await
    }

    async fn send_location_share(
        &self,
        phone: &str,
        method: DeliveryMethod,
        location: &str,
    ) -> Result<(), TagError> {
        debug!(method = method.as_str(), "Sending location share");

        self.post(
            "/v1/messages/location",
            &serde_json::json!({
                "to": phone,
                "channel": method.as_str(),
                "location": location,
            }),
        )
        .await
    }
}
