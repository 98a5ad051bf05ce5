use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{api_error, store_error, ApiError};
use crate::auth::{auth, Identity};
use crate::models::{
    CreateTaskRequest, TaskDeleteResponse, TaskProgressRequest, TaskRecord, TaskStatusRequest,
};
use crate::services::task_service::{self, TaskError};
use crate::state::AppState;

fn task_error(e: TaskError) -> ApiError {
    match e {
        TaskError::NotFound => api_error(StatusCode::NOT_FOUND, e.to_string()),
        TaskError::NotAssigned => api_error(StatusCode::FORBIDDEN, e.to_string()),
        TaskError::Store(e) => store_error(e),
    }
}

/// Create a task in a group
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<String>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskRecord>), ApiError> {
    auth::ensure_group_member(&identity, &group_id)?;
    let task = task_service::create_task(&state, &identity, &group_id, request)
        .await
        .map_err(task_error)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Change the status of a task
pub async fn update_task_status(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path((group_id, task_id)): Path<(String, Uuid)>,
    Json(request): Json<TaskStatusRequest>,
) -> Result<(StatusCode, Json<TaskRecord>), ApiError> {
    auth::ensure_group_member(&identity, &group_id)?;
    let task = task_service::change_status(&state, &identity, &group_id, task_id, request.status)
        .await
        .map_err(task_error)?;
    Ok((StatusCode::OK, Json(task)))
}

/// Set the progress of a task
pub async fn update_task_progress(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path((group_id, task_id)): Path<(String, Uuid)>,
    Json(request): Json<TaskProgressRequest>,
) -> Result<(StatusCode, Json<TaskRecord>), ApiError> {
    auth::ensure_group_member(&identity, &group_id)?;
    let task = task_service::update_progress(&state, &identity, &group_id, task_id, request.progress)
        .await
        .map_err(task_error)?;
    Ok((StatusCode::OK, Json(task)))
}

/// Delete a task
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path((group_id, task_id)): Path<(String, Uuid)>,
) -> Result<(StatusCode, Json<TaskDeleteResponse>), ApiError> {
    auth::ensure_group_member(&identity, &group_id)?;
    task_service::delete_task(&state, &identity, &group_id, task_id)
        .await
        .map_err(task_error)?;
    Ok((StatusCode::OK, Json(TaskDeleteResponse { success: true })))
}
