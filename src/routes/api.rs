use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handlers::{
    create_event, create_task, delete_task, diagnostics, get_analytics, health_check,
    list_messages, push_notification, ready_check, register_file, update_task_progress,
    update_task_status,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::state::AppState;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    let protected = Router::<Arc<AppState>>::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/groups/:group_id/analytics", get(get_analytics))
        .route("/v1/groups/:group_id/messages", get(list_messages))
        .route("/v1/groups/:group_id/tasks", post(create_task))
        .route("/v1/groups/:group_id/tasks/:task_id", axum::routing::delete(delete_task))
        .route("/v1/groups/:group_id/tasks/:task_id/status", put(update_task_status))
        .route("/v1/groups/:group_id/tasks/:task_id/progress", put(update_task_progress))
        .route("/v1/groups/:group_id/files", post(register_file))
        .route("/v1/groups/:group_id/events", post(create_event))
        .route("/v1/groups/:group_id/notifications", post(push_notification))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)); // Applies to all routes added above

    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(protected)
        .with_state(state)
}
