use codronix_collab::config::Config;
use codronix_collab::db::MemoryStore;
use codronix_collab::routes::build_router;
use codronix_collab::state::AppState;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> String {
    let mut config = Config::default();
    config.presence_settle_ms = 20;
    let state = AppState::new(config, Arc::new(MemoryStore::new()));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}/ws", addr)
}

async fn connect(url: &str) -> Client {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn send(ws: &mut Client, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Next event of the given type, skipping unrelated traffic.
async fn next_of_type(ws: &mut Client, kind: &str) -> Value {
    let wait = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let event: Value = serde_json::from_str(text.as_str()).unwrap();
                    if event["type"] == kind {
                        return event;
                    }
                }
                Some(Ok(_)) => continue,
                other => panic!("socket ended while waiting for {}: {:?}", kind, other),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", kind))
}

#[tokio::test]
async fn editor_room_edits_reach_peers_and_disconnect_is_announced() {
    let url = spawn_server().await;
    let mut ada = connect(&url).await;
    let mut bob = connect(&url).await;

    send(&mut ada, json!({"type": "join-editor-room", "roomId": "abc123", "displayName": "Ada"})).await;
    let joined = next_of_type(&mut ada, "editor-room-joined").await;
    assert_eq!(joined["members"].as_array().unwrap().len(), 1);
    let ada_conn = joined["connId"].as_str().unwrap().to_string();

    send(&mut bob, json!({"type": "join-editor-room", "roomId": "abc123", "displayName": "Bob"})).await;
    let joined = next_of_type(&mut bob, "editor-room-joined").await;
    assert_eq!(joined["members"].as_array().unwrap().len(), 2);
    assert_eq!(joined["displayName"], "Bob");
    let seen_by_ada = next_of_type(&mut ada, "editor-room-joined").await;
    assert_eq!(seen_by_ada["displayName"], "Bob");

    send(&mut ada, json!({"type": "code-change", "roomId": "abc123", "code": "x = 1"})).await;
    let change = next_of_type(&mut bob, "code-change").await;
    assert_eq!(change["code"], "x = 1");

    send(&mut ada, json!({"type": "cursor-change", "roomId": "abc123", "cursor": {"line": 1, "ch": 4}})).await;
    let cursor = next_of_type(&mut bob, "cursor-change").await;
    assert_eq!(cursor["connId"], ada_conn.as_str());
    assert_eq!(cursor["displayName"], "Ada");
    assert!(cursor["color"].as_str().unwrap().starts_with('#'));

    ada.close(None).await.unwrap();
    let gone = next_of_type(&mut bob, "disconnected").await;
    assert_eq!(gone["connId"], ada_conn.as_str());
    assert_eq!(gone["displayName"], "Ada");
}

#[tokio::test]
async fn late_joiner_receives_current_text() {
    let url = spawn_server().await;
    let mut ada = connect(&url).await;
    let mut cy = connect(&url).await;

    send(&mut ada, json!({"type": "join-editor-room", "roomId": "r1", "displayName": "Ada"})).await;
    next_of_type(&mut ada, "editor-room-joined").await;
    send(&mut ada, json!({"type": "code-change", "roomId": "r1", "code": "fn main() {}"})).await;
    // Ping round trip so the edit is applied before the second join.
    send(&mut ada, json!({"type": "ping"})).await;
    next_of_type(&mut ada, "pong").await;

    send(&mut cy, json!({"type": "join-editor-room", "roomId": "r1", "displayName": "Cy"})).await;
    let code = next_of_type(&mut cy, "code-change").await;
    assert_eq!(code["code"], "fn main() {}");
}

#[tokio::test]
async fn chat_message_is_broadcast_to_the_whole_group() {
    let url = spawn_server().await;
    let mut ada = connect(&url).await;
    let mut bob = connect(&url).await;

    send(&mut ada, json!({"type": "join-group", "groupId": "G1", "participantId": "u1", "name": "Ada"})).await;
    let online = next_of_type(&mut ada, "online-users").await;
    assert_eq!(online["users"].as_array().unwrap().len(), 1);

    send(&mut bob, json!({"type": "join-group", "groupId": "G1", "participantId": "u2", "name": "Bob"})).await;
    let joined = next_of_type(&mut ada, "user-joined").await;
    assert_eq!(joined["participantId"], "u2");
    assert_eq!(joined["message"], "Bob joined the chat");
    next_of_type(&mut bob, "online-users").await;

    send(&mut ada, json!({"type": "send-message", "groupId": "G1", "text": "hello"})).await;
    for ws in [&mut ada, &mut bob] {
        let event = next_of_type(ws, "new-message").await;
        assert_eq!(event["message"]["text"], "hello");
        assert_eq!(event["message"]["senderId"]["id"], "u1");
        assert_eq!(event["message"]["senderId"]["name"], "Ada");
    }

    let summary = next_of_type(&mut bob, "analytics-update").await;
    assert_eq!(summary["groupId"], "G1");
}

#[tokio::test]
async fn invalid_chat_message_is_reported_to_sender_only() {
    let url = spawn_server().await;
    let mut ada = connect(&url).await;

    send(&mut ada, json!({"type": "join-group", "groupId": "G1", "participantId": "u1", "name": "Ada"})).await;
    next_of_type(&mut ada, "online-users").await;

    send(&mut ada, json!({"type": "send-message", "groupId": "", "text": "hello"})).await;
    let error = next_of_type(&mut ada, "message-error").await;
    assert_eq!(error["error"], "Missing required fields: groupId and text");
    assert_eq!(error["originalMessage"], json!({"type": "send-message", "groupId": "", "text": "hello"}));

    send(&mut ada, json!({"type": "join-group", "groupId": "G1"})).await;
    let error = next_of_type(&mut ada, "join-error").await;
    assert_eq!(error["error"], "Missing required fields: groupId and name");
}

#[tokio::test]
async fn ping_and_malformed_frames_keep_the_socket_open() {
    let url = spawn_server().await;
    let mut ada = connect(&url).await;

    ada.send(Message::Text("not json".into())).await.unwrap();
    let error = next_of_type(&mut ada, "error").await;
    assert!(error["error"].as_str().unwrap().starts_with("Invalid message"));

    send(&mut ada, json!({"type": "ping"})).await;
    let pong = next_of_type(&mut ada, "pong").await;
    assert!(chrono::DateTime::parse_from_rfc3339(pong["date"].as_str().unwrap()).is_ok());
}
