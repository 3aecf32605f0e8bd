//! Public profile handler

use axum::extract::{Path, State};
use axum::Json;

use pawtag_core::PublicProfile;
use pawtag_types::ProfileId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/v1/profiles/{id}/public
///
/// Redacted public view. Entitlement is re-validated at read time, so a
/// stale link from an earlier scan reveals nothing.
pub async fn public_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicProfile>> {
    let profile_id = ProfileId::parse(&id)
        .map_err(|_| ApiError::BadRequest("Invalid profile id".to_string()))?;

    let view = state.resolver.public_profile(profile_id).await?;
    Ok(Json(view))
}
