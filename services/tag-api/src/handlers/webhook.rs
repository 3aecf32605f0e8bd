//! Stripe webhook handler

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use std::time::Instant;

use pawtag_core::TagError;

use crate::state::AppState;

/// POST /webhooks/stripe
///
/// Handle Stripe webhook events with signature verification. The body must
/// stay raw: the signature covers the exact bytes on the wire.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let start = Instant::now();

    let Some(sig_header) = headers.get("stripe-signature") else {
        tracing::warn!("Missing Stripe-Signature header");
        return StatusCode::BAD_REQUEST;
    };

    let Ok(signature) = sig_header.to_str() else {
        tracing::warn!("Invalid Stripe-Signature header encoding");
        return StatusCode::BAD_REQUEST;
    };

    match state.engine.process_webhook(&body, signature).await {
        Ok(()) => {
            metrics::counter!("tag_webhooks_processed_total", "status" => "success").increment(1);
            metrics::histogram!(
                "tag_operation_duration_seconds",
                "operation" => "process_webhook"
            )
            .record(start.elapsed().as_secs_f64());

            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(error = ?e, "Webhook rejected");
            metrics::counter!("tag_webhooks_processed_total", "status" => "error").increment(1);

            // Only signature/parse failures reach here; handler errors are
            // acknowledged upstream so the processor can redeliver safely.
            match e {
                TagError::WebhookError(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }
}
