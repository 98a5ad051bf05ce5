use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::ApiError;
use crate::auth::{auth, Identity};
use crate::models::{NotificationRequest, NotificationResponse};
use crate::services::group_service;
use crate::state::AppState;

/// Push a notification to every live socket of a group
pub async fn push_notification(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<String>,
    Json(request): Json<NotificationRequest>,
) -> Result<(StatusCode, Json<NotificationResponse>), ApiError> {
    auth::ensure_group_member(&identity, &group_id)?;
    let delivered = group_service::notify(&state, &group_id, request).await;
    info!("Notification for group {} queued to {} connections", group_id, delivered);
    Ok((StatusCode::OK, Json(NotificationResponse { delivered })))
}
