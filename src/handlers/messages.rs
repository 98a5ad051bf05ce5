use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{store_error, ApiError};
use crate::auth::{auth, Identity};
use crate::models::ChatMessage;
use crate::state::AppState;

/// Chat history of a group, oldest first
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<String>,
) -> Result<(StatusCode, Json<Vec<ChatMessage>>), ApiError> {
    auth::ensure_group_member(&identity, &group_id)?;
    let messages = state.store.list_messages(&group_id).await.map_err(store_error)?;
    Ok((StatusCode::OK, Json(messages)))
}
