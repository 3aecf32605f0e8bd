//! Finder location sharing handler

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use pawtag_core::DeliveryMethod;
use pawtag_types::ProfileId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Free-text location descriptions stay short
const MAX_MANUAL_LOCATION_LEN: usize = 280;

#[derive(Debug, Deserialize)]
pub struct ShareLocationRequest {
    /// `sms` or `whatsapp`
    pub method: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub manual_location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShareLocationResponse {
    /// Masked owner phone the message went to; the raw number never leaves
    pub phone_masked: String,
}

/// POST /api/v1/profiles/{id}/share-location
pub async fn share_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ShareLocationRequest>,
) -> ApiResult<Json<ShareLocationResponse>> {
    let start = Instant::now();

    let profile_id = ProfileId::parse(&id)
        .map_err(|_| ApiError::BadRequest("Invalid profile id".to_string()))?;

    let method: DeliveryMethod = req.method.parse()?;
    let location = validate_location(&req)?;

    let phone_masked = state
        .resolver
        .share_location(profile_id, method, &location)
        .await?;

    metrics::counter!("tag_location_shares_total", "method" => method.as_str()).increment(1);
    metrics::histogram!("tag_operation_duration_seconds", "operation" => "share_location")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(ShareLocationResponse { phone_masked }))
}

/// GPS mode needs both coordinates; otherwise a manual description is
/// required. Half a coordinate pair is always a caller bug.
fn validate_location(req: &ShareLocationRequest) -> Result<String, ApiError> {
    match (req.latitude, req.longitude) {
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(ApiError::BadRequest(
                    "Coordinates out of range".to_string(),
                ));
            }
            Ok(format!("{lat},{lon}"))
        }
        (None, None) => {
            let manual = req
                .manual_location
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    ApiError::BadRequest(
                        "Either coordinates or manual_location is required".to_string(),
                    )
                })?;
            if manual.len() > MAX_MANUAL_LOCATION_LEN {
                return Err(ApiError::BadRequest("manual_location too long".to_string()));
            }
            Ok(manual.to_string())
        }
        _ => Err(ApiError::BadRequest(
            "latitude and longitude must be provided together".to_string(),
        )),
    }
}
