//! Public scan handler

use axum::extract::{Path, State};
use axum::Json;
use std::time::Instant;

use pawtag_types::ScanOutcome;

use crate::error::ApiResult;
use crate::state::AppState;
use pawtag_core::TagError;

/// Longest code shape we ever mint; anything longer is junk input
const MAX_CODE_LEN: usize = 32;

/// GET /t/{code}
///
/// Public scan endpoint. Returns an action token, never profile data; the
/// caller follows the redirect it describes.
pub async fn scan_tag(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<ScanOutcome>> {
    let start = Instant::now();

    // Junk-shaped codes read as unknown without touching the store
    if code.is_empty()
        || code.len() > MAX_CODE_LEN
        || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(TagError::TagNotFound.into());
    }

    let outcome = state.resolver.resolve_scan(&code).await?;

    let action = match &outcome {
        ScanOutcome::RedirectToProfile { .. } => "profile",
        ScanOutcome::RedirectToVerification { .. } => "verification",
    };
    metrics::counter!("tag_scans_total", "action" => action).increment(1);
    metrics::histogram!("tag_operation_duration_seconds", "operation" => "scan")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(outcome))
}
