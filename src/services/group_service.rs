use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::auth::Identity;
use crate::db::StoreError;
use crate::models::{
    file_type_of, CalendarEventRecord, CreateCalendarEventRequest, FileRecord, NewCalendarEvent,
    NewFile, NotificationPayload, NotificationRequest, RegisterFileRequest, RelayPayload,
    ServerMessage,
};
use crate::services::analytics_service;
use crate::services::task_service::caller_activity;
use crate::state::AppState;

fn relay_of<T: Serialize>(record: &T) -> Result<RelayPayload, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(RelayPayload { fields }),
        _ => Ok(RelayPayload::default()),
    }
}

/// Record an uploaded file and tell the whole group about it.
pub async fn register_file(
    state: &Arc<AppState>,
    identity: &Identity,
    group_id: &str,
    request: RegisterFileRequest,
) -> Result<FileRecord, StoreError> {
    let file_name = request.file_name.trim().to_string();
    if file_name.is_empty() {
        return Err(StoreError::InvalidInput("fileName is required".to_string()));
    }
    let file_type = request
        .file_type
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| file_type_of(&file_name));

    let file = state
        .store
        .insert_file(NewFile {
            group_id: group_id.to_string(),
            file_name,
            file_type,
            storage_key: request.storage_key,
            uploaded_by: identity.user_id.clone(),
            size: request.size.max(0),
        })
        .await?;
    info!("File {} ({}) shared in group {}", file.file_name, file.file_type, group_id);

    state
        .broadcast_to_group(group_id, ServerMessage::FileShared(relay_of(&file)?))
        .await;
    let action = format!("shared a file: {}", file.file_name);
    analytics_service::trigger(state, group_id, Some(caller_activity(identity, action)));
    Ok(file)
}

pub async fn create_event(
    state: &Arc<AppState>,
    identity: &Identity,
    group_id: &str,
    request: CreateCalendarEventRequest,
) -> Result<CalendarEventRecord, StoreError> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(StoreError::InvalidInput("title is required".to_string()));
    }
    if matches!(request.end, Some(end) if end < request.start) {
        return Err(StoreError::InvalidInput("end must not be before start".to_string()));
    }

    let event = state
        .store
        .insert_event(NewCalendarEvent {
            group_id: group_id.to_string(),
            title,
            description: request.description,
            start: request.start,
            end: request.end,
            created_by: identity.user_id.clone(),
        })
        .await?;
    info!("Calendar event {} created in group {}", event.id, group_id);

    state
        .broadcast_to_group(group_id, ServerMessage::EventCreated(relay_of(&event)?))
        .await;
    analytics_service::trigger(state, group_id, Some(caller_activity(identity, "created a calendar event")));
    Ok(event)
}

/// Push a notification to every socket of the group. Returns how many
/// connections it was queued for.
pub async fn notify(state: &AppState, group_id: &str, request: NotificationRequest) -> usize {
    let payload = NotificationPayload {
        kind: request.kind,
        message: request.message,
        data: request.data,
    };
    state
        .broadcast_to_group(group_id, ServerMessage::Notification(payload))
        .await
}
