use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{api_error, store_error, ApiError};
use crate::auth::{auth, Identity};
use crate::models::AnalyticsSummary;
use crate::state::AppState;

/// Get the stored analytics summary of a group
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<String>,
) -> Result<(StatusCode, Json<AnalyticsSummary>), ApiError> {
    auth::ensure_group_member(&identity, &group_id)?;

    match state.store.load_summary(&group_id).await.map_err(store_error)? {
        Some(summary) => Ok((StatusCode::OK, Json(summary))),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("No analytics for group '{}'", group_id),
        )),
    }
}
