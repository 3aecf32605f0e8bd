//! Shared test fixtures

pub mod mock_repos;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Generate a valid webhook signature for a payload
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let ts = Utc::now().timestamp();
    let signed = format!("{}.{}", ts, std::str::from_utf8(payload).unwrap());
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed.as_bytes());
    format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes()))
}

/// Build an `invoice.paid` webhook body
pub fn invoice_paid_payload(
    subscription_id: &str,
    payment_intent: Option<&str>,
    billing_reason: &str,
    amount_cents: i64,
) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": format!("evt_{}", uuid::Uuid::new_v4().simple()),
        "type": "invoice.paid",
        "created": Utc::now().timestamp(),
        "data": { "object": {
            "id": format!("in_{}", uuid::Uuid::new_v4().simple()),
            "status": "paid",
            "billing_reason": billing_reason,
            "payment_intent": payment_intent,
            "subscription": subscription_id,
            "amount_due": amount_cents,
            "amount_paid": amount_cents,
            "currency": "usd"
        }}
    }))
    .unwrap()
}

/// Build a subscription lifecycle webhook body
pub fn subscription_event_payload(
    event_type: &str,
    subscription_id: &str,
    status: &str,
    period_end_ts: i64,
) -> Vec<u8> {
    let now = Utc::now().timestamp();
    serde_json::to_vec(&serde_json::json!({
        "id": format!("evt_{}", uuid::Uuid::new_v4().simple()),
        "type": event_type,
        "created": now,
        "data": { "object": {
            "id": subscription_id,
            "status": status,
            "current_period_start": now,
            "current_period_end": period_end_ts,
            "cancel_at_period_end": false
        }}
    }))
    .unwrap()
}
