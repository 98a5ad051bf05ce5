use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{ReceivedMessage, ServerMessage};
use crate::state::AppState;
use crate::websocket::{msg_chat_handler, msg_domain_handler, msg_editor_handler, msg_ping_handler};
use crate::ws::ConnectionSender;

/// WebSocket handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    debug!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Generate unique connection ID to identify this client
    let conn_id = Uuid::new_v4().to_string();
    info!("WebSocket connection established with connection_id: {}", conn_id);

    let (mut sender, mut receiver) = socket.split();

    // Outbound queue of this connection, registered in the hub so any handler
    // can address it
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.hub.lock().await.connect(&conn_id, tx.clone());

    // Drain the outbound queue into the socket
    let writer_conn = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize event for {}: {}", writer_conn, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Read control messages until the client goes away
    let reader_state = state.clone();
    let reader_conn = conn_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_text(&reader_state, &reader_conn, &text, &tx).await,
                Message::Close(_) => break,
                _ => continue,
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.disconnect(&conn_id).await;
    info!("WebSocket connection {} terminated", conn_id);
}

async fn handle_text(state: &Arc<AppState>, conn_id: &str, text: &str, reply: &ConnectionSender) {
    match serde_json::from_str::<Value>(text) {
        Ok(frame) => dispatch(state, conn_id, frame, reply).await,
        Err(e) => invalid_message(conn_id, e, reply),
    }
}

fn invalid_message(conn_id: &str, e: serde_json::Error, reply: &ConnectionSender) {
    warn!("Failed to parse message on {}: {}", conn_id, e);
    let _ = reply.send(ServerMessage::Error {
        error: format!("Invalid message: {}", e),
    });
}

/// Route a control frame to its handler. The frame is kept as received so
/// rejections can echo it back untouched.
pub async fn dispatch(state: &Arc<AppState>, conn_id: &str, frame: Value, reply: &ConnectionSender) {
    let mut msg = match ReceivedMessage::deserialize(&frame) {
        Ok(msg) => msg,
        Err(e) => return invalid_message(conn_id, e, reply),
    };
    msg.trim_ids();
    debug!("Received {} on {}", msg.kind(), conn_id);

    match msg {
        ReceivedMessage::JoinEditorRoom(m) => {
            msg_editor_handler::handle_join_editor_room(state, conn_id, m, reply).await
        }
        ReceivedMessage::LeaveEditorRoom(m) => {
            msg_editor_handler::handle_leave_editor_room(state, conn_id, m).await
        }
        ReceivedMessage::CodeChange(m) => msg_editor_handler::handle_code_change(state, conn_id, m).await,
        ReceivedMessage::CursorChange(m) => msg_editor_handler::handle_cursor_change(state, conn_id, m).await,
        ReceivedMessage::SyncCodeRequest(m) => {
            msg_editor_handler::handle_sync_code_request(state, conn_id, m).await
        }
        ReceivedMessage::JoinGroup(m) => msg_chat_handler::handle_join_group(state, conn_id, m, reply).await,
        ReceivedMessage::LeaveGroup(m) => msg_chat_handler::handle_leave_group(state, conn_id, m).await,
        ReceivedMessage::SendMessage(m) => {
            msg_chat_handler::handle_send_message(state, conn_id, m, frame, reply).await
        }
        ReceivedMessage::TypingStart(m) => msg_chat_handler::handle_typing(state, conn_id, m, true).await,
        ReceivedMessage::TypingStop(m) => msg_chat_handler::handle_typing(state, conn_id, m, false).await,
        ReceivedMessage::UserOnPage(m) => msg_chat_handler::handle_user_on_page(state, conn_id, m).await,
        ReceivedMessage::TaskUpdate(m) => msg_domain_handler::handle_task_update(state, conn_id, m, reply).await,
        ReceivedMessage::FileShared(m) => msg_domain_handler::handle_file_shared(state, conn_id, m, reply).await,
        ReceivedMessage::EventCreated(m) => {
            msg_domain_handler::handle_event_created(state, conn_id, m, reply).await
        }
        ReceivedMessage::Ping => msg_ping_handler::handle_ping_message(conn_id, reply),
    }
}
