use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{
    EventCreatedMessage, FileSharedMessage, NewActivity, RelayPayload, ServerMessage,
    TaskUpdateMessage,
};
use crate::services::analytics_service;
use crate::state::AppState;
use crate::ws::{ConnectionSender, Purpose};

fn as_fields<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    }
}

/// The activity a relayed task update stands for, if any.
pub fn task_update_activity(msg: &TaskUpdateMessage) -> Option<NewActivity> {
    match (msg.status.as_deref(), &msg.completed_by, &msg.updated_by) {
        (Some("completed"), Some(by), _) => Some(NewActivity::new(by.clone(), "completed a task")),
        (Some("in_progress"), _, Some(by)) => Some(NewActivity::new(by.clone(), "started a task")),
        (_, _, Some(by)) => Some(NewActivity::new(by.clone(), "updated a task")),
        _ => None,
    }
}

/// Relay to the group on behalf of a member. Returns false, after telling the
/// sender, when the socket is not in the group.
async fn relay(
    state: &AppState,
    conn_id: &str,
    group_id: &str,
    message: ServerMessage,
    include_sender: bool,
    reply: &ConnectionSender,
) -> bool {
    let hub = state.hub.lock().await;
    if !hub.is_group_member(conn_id, group_id) {
        warn!("Connection {} is not in group {}, relay dropped", conn_id, group_id);
        let _ = reply.send(ServerMessage::Error {
            error: format!("Not a member of group {}", group_id),
        });
        return false;
    }
    let exclude = if include_sender { None } else { Some(conn_id) };
    let deliveries = hub.fan_out(Purpose::Chat, group_id, &message, exclude);
    hub.deliver(deliveries);
    true
}

/// Handle task-update: relayed to the other members.
pub async fn handle_task_update(
    state: &Arc<AppState>,
    conn_id: &str,
    msg: TaskUpdateMessage,
    reply: &ConnectionSender,
) {
    let payload = RelayPayload {
        fields: as_fields(&msg),
    };
    if !relay(state, conn_id, &msg.group_id, ServerMessage::TaskUpdated(payload), false, reply).await {
        return;
    }
    info!("Task updated in group {}", msg.group_id);
    if let Some(activity) = task_update_activity(&msg) {
        analytics_service::trigger(state, &msg.group_id, Some(activity));
    }
}

/// Handle file-shared: the file object goes to everyone in the group.
pub async fn handle_file_shared(
    state: &Arc<AppState>,
    conn_id: &str,
    msg: FileSharedMessage,
    reply: &ConnectionSender,
) {
    let fields = match &msg.file {
        Value::Object(fields) => fields.clone(),
        _ => {
            let mut fields = Map::new();
            fields.insert("fileName".to_string(), Value::String(msg.file_name.clone()));
            fields.insert("uploadedBy".to_string(), Value::String(msg.uploaded_by.clone()));
            fields
        }
    };
    let message = ServerMessage::FileShared(RelayPayload { fields });
    if !relay(state, conn_id, &msg.group_id, message, true, reply).await {
        return;
    }
    info!("File {} shared in group {}", msg.file_name, msg.group_id);
    let action = format!("shared a file: {}", msg.file_name);
    analytics_service::trigger(state, &msg.group_id, Some(NewActivity::new(msg.uploaded_by, action)));
}

/// Handle event-created: relayed to everyone in the group.
pub async fn handle_event_created(
    state: &Arc<AppState>,
    conn_id: &str,
    msg: EventCreatedMessage,
    reply: &ConnectionSender,
) {
    let payload = RelayPayload {
        fields: as_fields(&msg),
    };
    if !relay(state, conn_id, &msg.group_id, ServerMessage::EventCreated(payload), true, reply).await {
        return;
    }
    info!("Calendar event created in group {}", msg.group_id);
    analytics_service::trigger(
        state,
        &msg.group_id,
        Some(NewActivity::new(msg.created_by, "created a calendar event")),
    );
}
