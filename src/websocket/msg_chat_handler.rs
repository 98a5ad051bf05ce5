use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    JoinGroupMessage, LeaveGroupMessage, NewActivity, SendChatMessage, ServerMessage,
    TypingMessage, UserOnPageMessage, JOINED_GROUP_ACTION,
};
use crate::services::{analytics_service, chat_service};
use crate::state::AppState;
use crate::ws::ConnectionSender;

/// Handle join-group
pub async fn handle_join_group(
    state: &Arc<AppState>,
    conn_id: &str,
    msg: JoinGroupMessage,
    reply: &ConnectionSender,
) {
    let group_id = msg
        .group_id
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty());
    let (group_id, label) = match (group_id, msg.label()) {
        (Some(group_id), Some(label)) => (group_id.to_string(), label.to_string()),
        _ => {
            warn!("Rejecting join-group on {}: missing fields", conn_id);
            let _ = reply.send(ServerMessage::JoinError {
                error: "Missing required fields: groupId and name".to_string(),
            });
            return;
        }
    };
    let participant_id = msg
        .participant_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    {
        let mut hub = state.hub.lock().await;
        let deliveries = hub.join_group(conn_id, &group_id, &participant_id, &label);
        hub.deliver(deliveries);
    }

    let activity = if state.first_join_in_window(&group_id, &participant_id) {
        Some(NewActivity::named(participant_id, label, JOINED_GROUP_ACTION))
    } else {
        debug!("Join of {} in {} debounced", participant_id, group_id);
        None
    };
    analytics_service::trigger(state, &group_id, activity);
}

/// Handle leave-group
pub async fn handle_leave_group(state: &Arc<AppState>, conn_id: &str, msg: LeaveGroupMessage) {
    let refresh = {
        let mut hub = state.hub.lock().await;
        let (deliveries, refresh) = hub.leave_group(conn_id, &msg.group_id);
        hub.deliver(deliveries);
        refresh
    };
    if refresh {
        state.schedule_presence_refresh(msg.group_id);
    }
}

/// Handle send-message. A rejected message is echoed back to the sender
/// exactly as it arrived.
pub async fn handle_send_message(
    state: &Arc<AppState>,
    conn_id: &str,
    msg: SendChatMessage,
    frame: Value,
    reply: &ConnectionSender,
) {
    if let Err(e) = chat_service::send_message(state, conn_id, &msg).await {
        warn!("Message from {} rejected: {}", conn_id, e);
        let _ = reply.send(ServerMessage::MessageError {
            error: e.to_string(),
            original_message: frame,
        });
    }
}

/// Handle typing-start / typing-stop
pub async fn handle_typing(state: &AppState, conn_id: &str, msg: TypingMessage, is_typing: bool) {
    let hub = state.hub.lock().await;
    let deliveries = hub.typing(
        conn_id,
        &msg.group_id,
        &msg.participant_id,
        &msg.display_name,
        is_typing,
    );
    hub.deliver(deliveries);
}

/// Handle user-on-page. Only logged when the socket is that participant and
/// is in the group.
pub async fn handle_user_on_page(state: &Arc<AppState>, conn_id: &str, msg: UserOnPageMessage) {
    let name = {
        let hub = state.hub.lock().await;
        let ctx = match hub.registry.get(conn_id) {
            Some(ctx) => ctx,
            None => return,
        };
        if ctx.participant_id.as_deref() != Some(msg.participant_id.as_str())
            || !hub.is_group_member(conn_id, &msg.group_id)
        {
            debug!("Ignoring user-on-page from {} for {}", conn_id, msg.participant_id);
            return;
        }
        ctx.display_name.clone()
    };

    info!("{} is on page {}", msg.participant_id, msg.page_name);
    let action = format!("viewed the {} page", msg.page_name);
    let activity = match name {
        Some(name) => NewActivity::named(msg.participant_id, name, action),
        None => NewActivity::new(msg.participant_id, action),
    };
    analytics_service::trigger(state, &msg.group_id, Some(activity));
}
