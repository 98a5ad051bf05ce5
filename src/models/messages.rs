use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{AnalyticsSummary, ChatMessageView};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinEditorRoomMessage {
    pub room_id: String,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveEditorRoomMessage {
    pub room_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeChangeMessage {
    pub room_id: String,
    pub code: String,
}

/// Cursor and selection are opaque editor positions, relayed as-is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorChangeMessage {
    pub room_id: String,
    pub cursor: Value,
    #[serde(default)]
    pub selection: Option<Value>,
    /// Ignored, the server tags relays with the sending connection's id.
    #[serde(default)]
    pub conn_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncCodeRequestMessage {
    pub target_conn_id: String,
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupMessage {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl JoinGroupMessage {
    /// The label shown to peers: `name`, or `displayName` when no name was sent.
    pub fn label(&self) -> Option<&str> {
        [self.name.as_deref(), self.display_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveGroupMessage {
    pub group_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SendChatMessage {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub receiver_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingMessage {
    pub group_id: String,
    pub participant_id: String,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserOnPageMessage {
    pub group_id: String,
    pub participant_id: String,
    pub page_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateMessage {
    pub group_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub completed_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileSharedMessage {
    pub group_id: String,
    pub file_name: String,
    pub uploaded_by: String,
    #[serde(default)]
    pub file: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventCreatedMessage {
    pub group_id: String,
    pub created_by: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Control messages received from a client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join-editor-room")]
    JoinEditorRoom(JoinEditorRoomMessage),
    #[serde(rename = "leave-editor-room")]
    LeaveEditorRoom(LeaveEditorRoomMessage),
    #[serde(rename = "code-change")]
    CodeChange(CodeChangeMessage),
    #[serde(rename = "cursor-change")]
    CursorChange(CursorChangeMessage),
    #[serde(rename = "sync-code-request")]
    SyncCodeRequest(SyncCodeRequestMessage),
    #[serde(rename = "join-group")]
    JoinGroup(JoinGroupMessage),
    #[serde(rename = "leave-group")]
    LeaveGroup(LeaveGroupMessage),
    #[serde(rename = "send-message")]
    SendMessage(SendChatMessage),
    #[serde(rename = "typing-start")]
    TypingStart(TypingMessage),
    #[serde(rename = "typing-stop")]
    TypingStop(TypingMessage),
    #[serde(rename = "user-on-page")]
    UserOnPage(UserOnPageMessage),
    #[serde(rename = "task-update")]
    TaskUpdate(TaskUpdateMessage),
    #[serde(rename = "file-shared")]
    FileShared(FileSharedMessage),
    #[serde(rename = "event-created")]
    EventCreated(EventCreatedMessage),
    #[serde(rename = "ping")]
    Ping,
}

impl ReceivedMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ReceivedMessage::JoinEditorRoom(_) => "join-editor-room",
            ReceivedMessage::LeaveEditorRoom(_) => "leave-editor-room",
            ReceivedMessage::CodeChange(_) => "code-change",
            ReceivedMessage::CursorChange(_) => "cursor-change",
            ReceivedMessage::SyncCodeRequest(_) => "sync-code-request",
            ReceivedMessage::JoinGroup(_) => "join-group",
            ReceivedMessage::LeaveGroup(_) => "leave-group",
            ReceivedMessage::SendMessage(_) => "send-message",
            ReceivedMessage::TypingStart(_) => "typing-start",
            ReceivedMessage::TypingStop(_) => "typing-stop",
            ReceivedMessage::UserOnPage(_) => "user-on-page",
            ReceivedMessage::TaskUpdate(_) => "task-update",
            ReceivedMessage::FileShared(_) => "file-shared",
            ReceivedMessage::EventCreated(_) => "event-created",
            ReceivedMessage::Ping => "ping",
        }
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

impl ReceivedMessage {
    /// Trim room and group ids so every message addresses the same room the
    /// join did.
    pub fn trim_ids(&mut self) {
        match self {
            ReceivedMessage::JoinEditorRoom(m) => trim_in_place(&mut m.room_id),
            ReceivedMessage::LeaveEditorRoom(m) => trim_in_place(&mut m.room_id),
            ReceivedMessage::CodeChange(m) => trim_in_place(&mut m.room_id),
            ReceivedMessage::CursorChange(m) => trim_in_place(&mut m.room_id),
            ReceivedMessage::SyncCodeRequest(m) => trim_in_place(&mut m.target_conn_id),
            ReceivedMessage::JoinGroup(m) => {
                if let Some(group_id) = m.group_id.as_mut() {
                    trim_in_place(group_id);
                }
            }
            ReceivedMessage::LeaveGroup(m) => trim_in_place(&mut m.group_id),
            ReceivedMessage::SendMessage(m) => {
                if let Some(group_id) = m.group_id.as_mut() {
                    trim_in_place(group_id);
                }
            }
            ReceivedMessage::TypingStart(m) | ReceivedMessage::TypingStop(m) => {
                trim_in_place(&mut m.group_id)
            }
            ReceivedMessage::UserOnPage(m) => trim_in_place(&mut m.group_id),
            ReceivedMessage::TaskUpdate(m) => trim_in_place(&mut m.group_id),
            ReceivedMessage::FileShared(m) => trim_in_place(&mut m.group_id),
            ReceivedMessage::EventCreated(m) => trim_in_place(&mut m.group_id),
            ReceivedMessage::Ping => {}
        }
    }
}

/// One entry of a room or group member listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub conn_id: String,
    pub participant_id: String,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceNotice {
    pub participant_id: String,
    pub display_name: String,
    pub message: String,
}

/// Domain payload relayed verbatim to a group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RelayPayload {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

/// Events pushed from the server to a client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "editor-room-joined", rename_all = "camelCase")]
    EditorRoomJoined {
        members: Vec<MemberInfo>,
        display_name: String,
        conn_id: String,
    },
    #[serde(rename = "code-change")]
    CodeChange { code: String },
    #[serde(rename = "cursor-change", rename_all = "camelCase")]
    CursorChange {
        cursor: Value,
        selection: Option<Value>,
        conn_id: String,
        display_name: String,
        color: String,
    },
    #[serde(rename = "disconnected", rename_all = "camelCase")]
    Disconnected { conn_id: String, display_name: String },
    #[serde(rename = "user-joined")]
    UserJoined(PresenceNotice),
    #[serde(rename = "user-left")]
    UserLeft(PresenceNotice),
    #[serde(rename = "online-users")]
    OnlineUsers { users: Vec<MemberInfo> },
    #[serde(rename = "new-message")]
    NewMessage { message: ChatMessageView },
    #[serde(rename = "message-error", rename_all = "camelCase")]
    MessageError { error: String, original_message: Value },
    #[serde(rename = "join-error")]
    JoinError { error: String },
    #[serde(rename = "user-typing", rename_all = "camelCase")]
    UserTyping {
        participant_id: String,
        display_name: String,
        is_typing: bool,
    },
    #[serde(rename = "task-updated")]
    TaskUpdated(RelayPayload),
    #[serde(rename = "file-shared")]
    FileShared(RelayPayload),
    #[serde(rename = "event-created")]
    EventCreated(RelayPayload),
    #[serde(rename = "notification")]
    Notification(NotificationPayload),
    #[serde(rename = "analytics-update")]
    AnalyticsUpdate(AnalyticsSummary),
    #[serde(rename = "pong")]
    Pong { date: String },
    #[serde(rename = "error")]
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_editor_control_messages() {
        let msg: ReceivedMessage = serde_json::from_value(json!({
            "type": "join-editor-room",
            "roomId": "abc123",
            "displayName": "Ada"
        }))
        .unwrap();
        assert_eq!(
            msg,
            ReceivedMessage::JoinEditorRoom(JoinEditorRoomMessage {
                room_id: "abc123".to_string(),
                display_name: "Ada".to_string(),
            })
        );

        let msg: ReceivedMessage = serde_json::from_value(json!({
            "type": "cursor-change",
            "roomId": "abc123",
            "cursor": {"line": 3, "ch": 7}
        }))
        .unwrap();
        match msg {
            ReceivedMessage::CursorChange(c) => {
                assert_eq!(c.cursor, json!({"line": 3, "ch": 7}));
                assert!(c.selection.is_none());
                assert!(c.conn_id.is_none());
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn trim_ids_normalizes_room_and_group_ids() {
        let mut msg: ReceivedMessage = serde_json::from_value(json!({
            "type": "leave-group",
            "groupId": "  G1 "
        }))
        .unwrap();
        msg.trim_ids();
        assert_eq!(
            msg,
            ReceivedMessage::LeaveGroup(LeaveGroupMessage {
                group_id: "G1".to_string()
            })
        );

        let mut msg: ReceivedMessage = serde_json::from_value(json!({
            "type": "code-change",
            "roomId": "abc123\n",
            "code": "  keep me  "
        }))
        .unwrap();
        msg.trim_ids();
        match msg {
            ReceivedMessage::CodeChange(m) => {
                assert_eq!(m.room_id, "abc123");
                assert_eq!(m.code, "  keep me  ");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn ping_has_no_payload() {
        let msg: ReceivedMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ReceivedMessage::Ping);
        assert_eq!(msg.kind(), "ping");
    }

    #[test]
    fn task_update_keeps_domain_payload() {
        let msg: ReceivedMessage = serde_json::from_value(json!({
            "type": "task-update",
            "groupId": "G1",
            "status": "completed",
            "completedBy": "u2",
            "taskId": "t-9",
            "title": "Ship it"
        }))
        .unwrap();
        let ReceivedMessage::TaskUpdate(update) = msg else {
            panic!("expected task-update");
        };
        assert_eq!(update.group_id, "G1");
        assert_eq!(update.completed_by.as_deref(), Some("u2"));
        assert_eq!(update.payload.get("taskId"), Some(&json!("t-9")));
        assert!(!update.payload.contains_key("groupId"));
    }

    #[test]
    fn join_group_label_prefers_name() {
        let join = JoinGroupMessage {
            group_id: Some("G1".to_string()),
            display_name: Some("ada".to_string()),
            name: Some("Ada Lovelace".to_string()),
            ..Default::default()
        };
        assert_eq!(join.label(), Some("Ada Lovelace"));

        let join = JoinGroupMessage {
            name: Some("   ".to_string()),
            display_name: Some("ada".to_string()),
            ..Default::default()
        };
        assert_eq!(join.label(), Some("ada"));

        assert_eq!(JoinGroupMessage::default().label(), None);
    }

    #[test]
    fn server_messages_use_camel_case_fields() {
        let msg = ServerMessage::CursorChange {
            cursor: json!({"line": 1, "ch": 0}),
            selection: None,
            conn_id: "c1".to_string(),
            display_name: "Ada".to_string(),
            color: "#FF6B6B".to_string(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "cursor-change");
        assert_eq!(value["connId"], "c1");
        assert_eq!(value["displayName"], "Ada");

        let msg = ServerMessage::UserTyping {
            participant_id: "u1".to_string(),
            display_name: "Ada".to_string(),
            is_typing: true,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["isTyping"], true);
        assert_eq!(value["participantId"], "u1");
    }
}
