//! Stripe webhook handling
//!
//! Signature verification runs against the raw, untransformed body; any
//! parsing happens only after the signature checks out.

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error, info, instrument, warn};

use crate::error::TagError;
use crate::stripe::{StripeInvoice, StripeSubscription};

/// Webhook event types we handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// Customer subscription created
    CustomerSubscriptionCreated,
    /// Customer subscription updated
    CustomerSubscriptionUpdated,
    /// Customer subscription deleted
    CustomerSubscriptionDeleted,
    /// Invoice paid (payment succeeded)
    InvoicePaid,
    /// Invoice payment failed
    InvoicePaymentFailed,
    /// Unknown event type
    Unknown(String),
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "customer.subscription.created" => Self::CustomerSubscriptionCreated,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Parsed webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event ID
    pub id: String,
    /// Event type
    pub event_type: WebhookEventType,
    /// Event data
    pub data: WebhookEventData,
    /// When the event was created (Unix timestamp)
    pub created: i64,
}

/// Webhook event data
#[derive(Debug, Clone)]
pub enum WebhookEventData {
    /// Subscription data
    Subscription(SubscriptionData),
    /// Invoice data
    Invoice(InvoiceData),
    /// Raw JSON for unknown events
    Raw(serde_json::Value),
}

/// Subscription event data
#[derive(Debug, Clone)]
pub struct SubscriptionData {
    /// External subscription ID
    pub subscription_id: String,
    /// External status string (`active`, `canceled`, `unpaid`, ...)
    pub status: String,
    /// Current period start
    pub period_start: DateTime<Utc>,
    /// Current period end
    pub period_end: DateTime<Utc>,
    /// Whether it cancels at period end
    pub cancel_at_period_end: bool,
}

/// Invoice event data, normalized to what the reconciliation ladder needs
#[derive(Debug, Clone)]
pub struct InvoiceData {
    /// Invoice ID
    pub invoice_id: String,
    /// External subscription ID the invoice bills for
    pub subscription_id: Option<String>,
    /// Why the invoice was issued (`subscription_create`,
    /// `subscription_cycle`, ...)
    pub billing_reason: Option<String>,
    /// Payment-intent id of the charge
    pub payment_intent_id: Option<String>,
    /// Invoice status
    pub status: String,
    /// Amount paid in cents
    pub amount_cents: i64,
    /// Currency
    pub currency: String,
}

/// Webhook handler for verifying and parsing Stripe events
#[derive(Clone)]
pub struct WebhookHandler {
    webhook_secret: String,
}

impl WebhookHandler {
    /// Create a new webhook handler
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify and parse a webhook payload
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, TagError> {
        // Verify signature over the raw body first
        self.verify_signature(payload, signature)?;

        // Parse event
        let raw_event: RawStripeEvent = serde_json::from_slice(payload)
            .map_err(|e| TagError::WebhookError(e.to_string()))?;

        debug!(event_id = %raw_event.id, event_type = %raw_event.event_type, "Parsed webhook event");

        let event_type = WebhookEventType::from(raw_event.event_type.as_str());
        let data = Self::parse_event_data(&event_type, raw_event.data.object)?;

        Ok(WebhookEvent {
            id: raw_event.id,
            event_type,
            data,
            created: raw_event.created,
        })
    }

    /// Verify Stripe webhook signature
    fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<(), TagError> {
        // Parse signature header: t=timestamp,v1=signature
        let mut timestamp: Option<&str> = None;
        let mut sig_v1: Option<&str> = None;

        for part in signature.split(',') {
            if let Some((key, value)) = part.split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => sig_v1 = Some(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            TagError::WebhookError("Missing timestamp".to_string())
        })?;

        let sig_v1 = sig_v1.ok_or_else(|| {
            warn!("Missing v1 signature in webhook signature");
            TagError::WebhookError("Missing signature".to_string())
        })?;

        // Build signed payload
        let signed_payload = format!(
            "{}.{}",
            timestamp,
            std::str::from_utf8(payload)
                .map_err(|_| TagError::WebhookError("Invalid payload encoding".to_string()))?
        );

        // Compute expected signature
        let mut mac = Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| TagError::Internal("HMAC error".to_string()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Compare signatures (constant-time)
        if !constant_time_eq(sig_v1.as_bytes(), expected.as_bytes()) {
            error!("Webhook signature verification failed");
            return Err(TagError::WebhookError(
                "Signature verification failed".to_string(),
            ));
        }

        // Check timestamp freshness (within 5 minutes)
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| TagError::WebhookError("Invalid timestamp format".to_string()))?;
        let now = Utc::now().timestamp();
        if (now - ts).abs() > 300 {
            warn!(timestamp = ts, now = now, "Webhook timestamp too old");
            return Err(TagError::WebhookError("Timestamp too old".to_string()));
        }

        Ok(())
    }

    /// Parse event data based on type
    fn parse_event_data(
        event_type: &WebhookEventType,
        object: serde_json::Value,
    ) -> Result<WebhookEventData, TagError> {
        match event_type {
            WebhookEventType::CustomerSubscriptionCreated
            | WebhookEventType::CustomerSubscriptionUpdated
            | WebhookEventType::CustomerSubscriptionDeleted => {
                let sub: StripeSubscription = serde_json::from_value(object)
                    .map_err(|e| TagError::WebhookError(e.to_string()))?;
                Ok(WebhookEventData::Subscription(SubscriptionData {
                    subscription_id: sub.id,
                    status: sub.status,
                    period_start: Utc
                        .timestamp_opt(sub.current_period_start, 0)
                        .single()
                        .ok_or_else(|| {
                            TagError::WebhookError("Invalid period start".to_string())
                        })?,
                    period_end: Utc
                        .timestamp_opt(sub.current_period_end, 0)
                        .single()
                        .ok_or_else(|| TagError::WebhookError("Invalid period end".to_string()))?,
                    cancel_at_period_end: sub.cancel_at_period_end,
                }))
            }
            WebhookEventType::InvoicePaid | WebhookEventType::InvoicePaymentFailed => {
                let inv: StripeInvoice = serde_json::from_value(object)
                    .map_err(|e| TagError::WebhookError(e.to_string()))?;
                Ok(WebhookEventData::Invoice(InvoiceData {
                    invoice_id: inv.id,
                    subscription_id: inv.subscription,
                    billing_reason: inv.billing_reason,
                    payment_intent_id: inv.payment_intent,
                    status: inv.status.unwrap_or_default(),
                    amount_cents: inv.amount_paid,
                    currency: inv.currency,
                }))
            }
            WebhookEventType::Unknown(_) => {
                info!("Received unknown webhook event type");
                Ok(WebhookEventData::Raw(object))
            }
        }
    }
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// Raw Stripe event for parsing
#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
    created: i64,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}
