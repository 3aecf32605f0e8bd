//! Order code assignment handler

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use pawtag_types::{OrderId, OrderKind, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignCodeRequest {
    pub user_id: String,
    pub order_id: String,
    /// `customer` or `guest`
    pub order_kind: String,
}

#[derive(Debug, Serialize)]
pub struct AssignCodeResponse {
    pub tag_code_id: String,
    pub code: String,
    pub status: String,
}

/// POST /api/v1/orders/assign-code
///
/// Claims one free code for an order. Out of stock is a 409, not a 500;
/// the shop flow surfaces it to the operator.
pub async fn assign_code(
    State(state): State<AppState>,
    Json(req): Json<AssignCodeRequest>,
) -> ApiResult<Json<AssignCodeResponse>> {
    let start = Instant::now();

    let user_id = UserId::parse(&req.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let order_id = OrderId::parse(&req.order_id)
        .map_err(|_| ApiError::BadRequest("Invalid order_id".to_string()))?;

    let order_kind = OrderKind::parse_lossy(&req.order_kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid order_kind: {}", req.order_kind)))?;

    let tag = state.registry.assign(user_id, order_id, order_kind).await?;

    metrics::counter!("tag_codes_assigned_total", "order_kind" => order_kind.as_str())
        .increment(1);
    metrics::histogram!("tag_operation_duration_seconds", "operation" => "assign_code")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(AssignCodeResponse {
        tag_code_id: tag.id.to_string(),
        code: tag.code,
        status: tag.status,
    }))
}
