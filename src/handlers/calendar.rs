use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{store_error, ApiError};
use crate::auth::{auth, Identity};
use crate::models::{CalendarEventRecord, CreateCalendarEventRequest};
use crate::services::group_service;
use crate::state::AppState;

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<String>,
    Json(request): Json<CreateCalendarEventRequest>,
) -> Result<(StatusCode, Json<CalendarEventRecord>), ApiError> {
    auth::ensure_group_member(&identity, &group_id)?;
    let event = group_service::create_event(&state, &identity, &group_id, request)
        .await
        .map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(event)))
}
