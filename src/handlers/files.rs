use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{store_error, ApiError};
use crate::auth::{auth, Identity};
use crate::models::{FileRecord, RegisterFileRequest};
use crate::services::group_service;
use crate::state::AppState;

/// Register an uploaded file with its group
pub async fn register_file(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<String>,
    Json(request): Json<RegisterFileRequest>,
) -> Result<(StatusCode, Json<FileRecord>), ApiError> {
    auth::ensure_group_member(&identity, &group_id)?;
    let file = group_service::register_file(&state, &identity, &group_id, request)
        .await
        .map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(file)))
}
