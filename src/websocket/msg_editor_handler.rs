use std::time::Instant;
use tracing::{debug, info};

use crate::models::{
    CodeChangeMessage, CursorChangeMessage, JoinEditorRoomMessage, LeaveEditorRoomMessage,
    ServerMessage, SyncCodeRequestMessage,
};
use crate::state::AppState;
use crate::ws::ConnectionSender;

/// Handle join-editor-room
pub async fn handle_join_editor_room(
    state: &AppState,
    conn_id: &str,
    msg: JoinEditorRoomMessage,
    reply: &ConnectionSender,
) {
    let room_id = msg.room_id.trim();
    if room_id.is_empty() {
        let _ = reply.send(ServerMessage::Error {
            error: "Missing required field: roomId".to_string(),
        });
        return;
    }
    let display_name = match msg.display_name.trim() {
        "" => "Anonymous",
        name => name,
    };

    let mut hub = state.hub.lock().await;
    let deliveries = hub.join_editor(
        conn_id,
        room_id,
        display_name,
        state.config.cursor_ttl(),
        Instant::now(),
    );
    let sent = hub.deliver(deliveries);
    info!("Connection {} joined editor room {} ({} events)", conn_id, room_id, sent);
}

/// Handle leave-editor-room
pub async fn handle_leave_editor_room(state: &AppState, conn_id: &str, msg: LeaveEditorRoomMessage) {
    let mut hub = state.hub.lock().await;
    let deliveries = hub.leave_editor(conn_id, &msg.room_id);
    hub.deliver(deliveries);
}

/// Handle code-change
pub async fn handle_code_change(state: &AppState, conn_id: &str, msg: CodeChangeMessage) {
    let mut hub = state.hub.lock().await;
    let deliveries = hub.propagate_edit(conn_id, &msg.room_id, &msg.code);
    let sent = hub.deliver(deliveries);
    debug!("Edit in room {} relayed to {} peers", msg.room_id, sent);
}

/// Handle cursor-change. The sender is always the socket itself, whatever
/// connection id the client put in the payload.
pub async fn handle_cursor_change(state: &AppState, conn_id: &str, msg: CursorChangeMessage) {
    let mut hub = state.hub.lock().await;
    let deliveries = hub.propagate_cursor(
        conn_id,
        &msg.room_id,
        msg.cursor,
        msg.selection,
        Instant::now(),
    );
    hub.deliver(deliveries);
}

/// Handle sync-code-request
pub async fn handle_sync_code_request(state: &AppState, conn_id: &str, msg: SyncCodeRequestMessage) {
    let mut hub = state.hub.lock().await;
    let deliveries = hub.sync_content_to(conn_id, &msg.target_conn_id, &msg.code);
    hub.deliver(deliveries);
}
