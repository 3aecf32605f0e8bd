//! Operator code-inventory handlers
//!
//! All routes here require the operator bearer token. Codes are physical
//! stock: generation mints unassigned rows, deletion only ever touches
//! rows that never shipped.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use pawtag_types::TagCodeId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1_000;

#[derive(Debug, Deserialize)]
pub struct GenerateCodesRequest {
    pub count: u32,
}

#[derive(Debug, Serialize)]
pub struct CodeSummary {
    pub id: String,
    pub code: String,
    pub status: String,
    pub scanned_count: i64,
}

#[derive(Debug, Serialize)]
pub struct GenerateCodesResponse {
    pub count: usize,
    pub codes: Vec<CodeSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ListCodesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListCodesResponse {
    pub codes: Vec<CodeSummary>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCodesRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteCodesResponse {
    pub deleted: Vec<String>,
    pub skipped: Vec<String>,
}

/// POST /admin/codes/generate
pub async fn generate_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateCodesRequest>,
) -> ApiResult<Json<GenerateCodesResponse>> {
    require_admin(&state, &headers)?;
    let start = Instant::now();

    let rows = state.registry.generate_batch(req.count).await?;

    metrics::counter!("tag_codes_generated_total").increment(rows.len() as u64);
    metrics::histogram!("tag_operation_duration_seconds", "operation" => "generate_codes")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(GenerateCodesResponse {
        count: rows.len(),
        codes: rows.into_iter().map(summarize).collect(),
    }))
}

/// GET /admin/codes
pub async fn list_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListCodesQuery>,
) -> ApiResult<Json<ListCodesResponse>> {
    require_admin(&state, &headers)?;

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit out of range 1-{MAX_LIST_LIMIT}"
        )));
    }

    let rows = state.registry.list(limit).await?;
    Ok(Json(ListCodesResponse {
        codes: rows.into_iter().map(summarize).collect(),
    }))
}

/// DELETE /admin/codes
///
/// Bulk deletion with partial success: assigned codes are reported as
/// skipped instead of failing the batch.
pub async fn delete_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DeleteCodesRequest>,
) -> ApiResult<Json<DeleteCodesResponse>> {
    require_admin(&state, &headers)?;

    if req.ids.is_empty() {
        return Err(ApiError::BadRequest("ids must not be empty".to_string()));
    }

    let mut ids = Vec::with_capacity(req.ids.len());
    for raw in &req.ids {
        ids.push(
            TagCodeId::parse(raw)
                .map_err(|_| ApiError::BadRequest(format!("Invalid code id: {raw}")))?,
        );
    }

    let report = state.registry.delete_codes(ids).await?;

    Ok(Json(DeleteCodesResponse {
        deleted: report.deleted.iter().map(ToString::to_string).collect(),
        skipped: report.skipped.iter().map(ToString::to_string).collect(),
    }))
}

fn summarize(row: pawtag_db::TagCodeRow) -> CodeSummary {
    CodeSummary {
        id: row.id.to_string(),
        code: row.code,
        status: row.status,
        scanned_count: row.scanned_count,
    }
}

/// Check the operator bearer token. A missing or malformed header is a
/// 401; a present-but-wrong token is a 403.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    if !constant_time_eq(token.as_bytes(), state.config.admin_token.as_bytes()) {
        tracing::warn!("Operator token rejected");
        return Err(ApiError::Forbidden);
    }

    Ok(())
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}
