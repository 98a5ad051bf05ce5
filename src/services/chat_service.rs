use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::StoreError;
use crate::models::{
    ChatMessageView, NewActivity, NewChatMessage, SendChatMessage, SenderInfo, ServerMessage,
};
use crate::services::analytics_service;
use crate::state::AppState;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Missing required fields: groupId and text")]
    MissingFields,

    #[error("Cannot determine sender ID")]
    UnknownSender,

    #[error("Failed to send message")]
    Store(#[from] StoreError),
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn resolve_sender(state: &AppState, conn_id: &str, sender_id: &str) -> SenderInfo {
    match state.store.find_user(sender_id).await {
        Ok(Some(user)) => {
            return SenderInfo {
                id: user.id,
                name: user.name,
                role: user.role,
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Sender lookup for {} failed: {}", sender_id, e),
    }
    let name = state
        .hub
        .lock()
        .await
        .registry
        .get(conn_id)
        .and_then(|ctx| ctx.display_name.clone())
        .unwrap_or_else(|| analytics_service::placeholder_name(sender_id));
    SenderInfo {
        id: sender_id.to_string(),
        name,
        role: "member".to_string(),
    }
}

/// Validate, persist, then broadcast a chat message to its group.
///
/// Nothing is broadcast unless the message was stored.
pub async fn send_message(
    state: &Arc<AppState>,
    conn_id: &str,
    request: &SendChatMessage,
) -> Result<ChatMessageView, ChatError> {
    let (group_id, text) = match (
        non_blank(request.group_id.as_deref()),
        non_blank(request.text.as_deref()),
    ) {
        (Some(group_id), Some(text)) => (group_id, text),
        _ => return Err(ChatError::MissingFields),
    };

    let sender_id = match non_blank(request.sender_id.as_deref()) {
        Some(id) => id,
        None => state
            .hub
            .lock()
            .await
            .registry
            .get(conn_id)
            .and_then(|ctx| ctx.participant_id.clone())
            .ok_or(ChatError::UnknownSender)?,
    };

    let stored = state
        .store
        .insert_message(NewChatMessage {
            group_id: group_id.clone(),
            sender_id: sender_id.clone(),
            receiver_id: non_blank(request.receiver_id.as_deref()),
            text,
        })
        .await
        .map_err(|e| {
            error!("Failed to store message for group {}: {}", group_id, e);
            e
        })?;

    let sender = resolve_sender(state, conn_id, &sender_id).await;
    let view = ChatMessageView::new(stored, sender);
    let sent = state
        .broadcast_to_group(
            &group_id,
            ServerMessage::NewMessage {
                message: view.clone(),
            },
        )
        .await;
    info!("Message {} broadcast to {} connections of group {}", view.id, sent, group_id);

    analytics_service::trigger(state, &group_id, Some(NewActivity::new(sender_id, "sent a message")));
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{ChatStore, MemoryStore};
    use crate::models::UserRecord;
    use tokio::sync::mpsc;

    async fn setup() -> (
        Arc<AppState>,
        Arc<MemoryStore>,
        mpsc::UnboundedReceiver<ServerMessage>,
        mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(UserRecord {
                id: "u1".to_string(),
                group_id: "G1".to_string(),
                name: "Ada".to_string(),
                role: "leader".to_string(),
            })
            .await;
        let state = AppState::new(Config::default(), store.clone());
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        {
            let mut hub = state.hub.lock().await;
            hub.connect("c1", tx1);
            hub.connect("c2", tx2);
            hub.join_group("c1", "G1", "u1", "Ada");
            hub.join_group("c2", "G1", "u2", "Bob");
        }
        (state, store, rx1, rx2)
    }

    fn new_messages(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ChatMessageView> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::NewMessage { message } = msg {
                out.push(message);
            }
        }
        out
    }

    #[tokio::test]
    async fn message_is_stored_then_broadcast_to_everyone() {
        let (state, store, mut rx1, mut rx2) = setup().await;
        let request = SendChatMessage {
            group_id: Some("G1".to_string()),
            text: Some("  hello  ".to_string()),
            ..Default::default()
        };

        let view = send_message(&state, "c1", &request).await.unwrap();
        assert_eq!(view.text, "hello");
        assert_eq!(view.sender_id.name, "Ada");
        assert_eq!(view.sender_id.role, "leader");

        assert_eq!(new_messages(&mut rx1).len(), 1);
        assert_eq!(new_messages(&mut rx2).len(), 1);
        assert_eq!(store.list_messages("G1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_group_is_rejected_without_side_effects() {
        let (state, store, mut rx1, mut rx2) = setup().await;
        let request = SendChatMessage {
            group_id: Some(String::new()),
            text: Some("hello".to_string()),
            sender_id: Some("u1".to_string()),
            receiver_id: None,
        };

        let err = send_message(&state, "c1", &request).await.unwrap_err();
        assert!(matches!(err, ChatError::MissingFields));
        assert!(store.list_messages("G1").await.unwrap().is_empty());
        assert!(new_messages(&mut rx1).is_empty());
        assert!(new_messages(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn failed_persist_emits_nothing() {
        let (state, store, mut rx1, mut rx2) = setup().await;
        store.set_fail_chat(true);
        let request = SendChatMessage {
            group_id: Some("G1".to_string()),
            text: Some("hello".to_string()),
            ..Default::default()
        };

        let err = send_message(&state, "c1", &request).await.unwrap_err();
        assert!(matches!(err, ChatError::Store(_)));
        assert_eq!(err.to_string(), "Failed to send message");
        assert!(new_messages(&mut rx1).is_empty());
        assert!(new_messages(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn sender_falls_back_to_connection_then_fails() {
        let (state, _store, _rx1, _rx2) = setup().await;
        let request = SendChatMessage {
            group_id: Some("G1".to_string()),
            text: Some("hi".to_string()),
            ..Default::default()
        };
        let view = send_message(&state, "c2", &request).await.unwrap();
        assert_eq!(view.sender_id.id, "u2");
        assert_eq!(view.sender_id.name, "Bob");
        assert_eq!(view.sender_id.role, "member");

        let err = send_message(&state, "unregistered", &request).await.unwrap_err();
        assert!(matches!(err, ChatError::UnknownSender));
    }
}
