use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Store is not reachable", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Analytics summary of a group
#[utoipa::path(
    get,
    path = "/api/v1/groups/{group_id}/analytics",
    params(("group_id" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Stored summary", body = AnalyticsSummary),
        (status = 403, description = "Not a member of the group", body = ErrorResponse),
        (status = 404, description = "No summary yet", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_analytics_doc() {}

/// Chat history of a group, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/groups/{group_id}/messages",
    params(("group_id" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Messages", body = [ChatMessage]),
        (status = 403, description = "Not a member of the group", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_messages_doc() {}

/// Create a task
#[utoipa::path(
    post,
    path = "/api/v1/groups/{group_id}/tasks",
    params(("group_id" = String, Path, description = "Group identifier")),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskRecord),
        (status = 400, description = "Invalid task", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_task_doc() {}

/// Change the status of a task (assignees only)
#[utoipa::path(
    put,
    path = "/api/v1/groups/{group_id}/tasks/{task_id}/status",
    params(
        ("group_id" = String, Path, description = "Group identifier"),
        ("task_id" = String, Path, description = "Task identifier")
    ),
    request_body = TaskStatusRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskRecord),
        (status = 403, description = "Caller is not assigned to the task", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn update_task_status_doc() {}

/// Set the progress of a task
#[utoipa::path(
    put,
    path = "/api/v1/groups/{group_id}/tasks/{task_id}/progress",
    params(
        ("group_id" = String, Path, description = "Group identifier"),
        ("task_id" = String, Path, description = "Task identifier")
    ),
    request_body = TaskProgressRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskRecord),
        (status = 400, description = "Progress above 100", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn update_task_progress_doc() {}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/api/v1/groups/{group_id}/tasks/{task_id}",
    params(
        ("group_id" = String, Path, description = "Group identifier"),
        ("task_id" = String, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "Task deleted", body = TaskDeleteResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn delete_task_doc() {}

/// Register an uploaded file
#[utoipa::path(
    post,
    path = "/api/v1/groups/{group_id}/files",
    params(("group_id" = String, Path, description = "Group identifier")),
    request_body = RegisterFileRequest,
    responses(
        (status = 201, description = "File registered and shared", body = FileRecord)
    )
)]
#[allow(dead_code)]
pub async fn register_file_doc() {}

/// Create a calendar event
#[utoipa::path(
    post,
    path = "/api/v1/groups/{group_id}/events",
    params(("group_id" = String, Path, description = "Group identifier")),
    request_body = CreateCalendarEventRequest,
    responses(
        (status = 201, description = "Event created", body = CalendarEventRecord),
        (status = 400, description = "Invalid event", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_event_doc() {}

/// Push a notification to a group
#[utoipa::path(
    post,
    path = "/api/v1/groups/{group_id}/notifications",
    params(("group_id" = String, Path, description = "Group identifier")),
    request_body = NotificationRequest,
    responses(
        (status = 200, description = "Notification queued", body = NotificationResponse)
    )
)]
#[allow(dead_code)]
pub async fn push_notification_doc() {}

/// Process diagnostics (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        get_analytics_doc,
        list_messages_doc,
        create_task_doc,
        update_task_status_doc,
        update_task_progress_doc,
        delete_task_doc,
        register_file_doc,
        create_event_doc,
        push_notification_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse, ErrorResponse, DiagnosticsResponse,
            AnalyticsSummary, ActivityEvent, ActivityUser,
            ChatMessage, TaskRecord, TaskStatus, CreateTaskRequest, TaskStatusRequest,
            TaskProgressRequest, TaskDeleteResponse, FileRecord, RegisterFileRequest,
            CalendarEventRecord, CreateCalendarEventRequest, NotificationRequest,
            NotificationResponse
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
