use chrono::Utc;
use tracing::{debug, error};

use crate::models::ServerMessage;
use crate::ws::ConnectionSender;

/// Handle a ping by replying with the server time.
pub fn handle_ping_message(conn_id: &str, reply: &ConnectionSender) {
    debug!("Ping message received on connection {}", conn_id);

    let pong = ServerMessage::Pong {
        date: Utc::now().to_rfc3339(),
    };
    if reply.send(pong).is_err() {
        error!("Failed to send Pong message on connection {}", conn_id);
    }
}
