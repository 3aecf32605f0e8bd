//! Subscription confirmation handler

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use pawtag_core::ConfirmCheckout;
use pawtag_types::{PlanType, TagCodeId, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfirmSubscriptionRequest {
    pub user_id: String,
    pub tag_code_id: Option<String>,
    /// `monthly`, `yearly` or `lifetime`
    pub plan: String,
    pub amount_cents: i64,
    pub currency: String,
    pub stripe_subscription_id: String,
    pub stripe_payment_intent_id: Option<String>,
    #[serde(default = "default_auto_renew")]
    pub auto_renew: bool,
}

fn default_auto_renew() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct PeriodResponse {
    pub id: String,
    pub plan: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
}

/// POST /api/v1/subscriptions/confirm
///
/// Synchronous confirmation flow: the client returns from checkout, we
/// validate the subscription with the processor and create the period.
pub async fn confirm_subscription(
    State(state): State<AppState>,
    Json(req): Json<ConfirmSubscriptionRequest>,
) -> ApiResult<Json<PeriodResponse>> {
    let start = Instant::now();

    let user_id = UserId::parse(&req.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let tag_code_id = req
        .tag_code_id
        .as_deref()
        .map(TagCodeId::parse)
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid tag_code_id".to_string()))?;

    let plan: PlanType = req
        .plan
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid plan: {}", req.plan)))?;

    if req.amount_cents < 0 {
        return Err(ApiError::BadRequest(
            "amount_cents must not be negative".to_string(),
        ));
    }

    if req.currency.len() != 3 || !req.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::BadRequest("Invalid currency code".to_string()));
    }

    if req.stripe_subscription_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "stripe_subscription_id is required".to_string(),
        ));
    }

    let period = state
        .engine
        .confirm_checkout(ConfirmCheckout {
            user_id,
            tag_code_id,
            plan,
            amount_cents: req.amount_cents,
            currency: req.currency.to_lowercase(),
            stripe_subscription_id: req.stripe_subscription_id,
            stripe_payment_intent_id: req.stripe_payment_intent_id,
            auto_renew: req.auto_renew,
        })
        .await?;

    metrics::counter!("tag_subscriptions_confirmed_total").increment(1);
    metrics::histogram!("tag_operation_duration_seconds", "operation" => "confirm_subscription")
        .record(start.elapsed().as_secs_f64());

    tracing::info!(user_id = %user_id, period_id = %period.id, "Subscription confirmed");

    Ok(Json(PeriodResponse {
        id: period.id.to_string(),
        plan: period.plan,
        status: period.status,
        start_date: period.start_date.to_rfc3339(),
        end_date: period.end_date.to_rfc3339(),
    }))
}
