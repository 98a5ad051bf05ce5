use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::ServerMessage;

/// Sender half of a connection's outbound queue. Anything holding a clone can
/// push events to that client.
pub type ConnectionSender = mpsc::UnboundedSender<ServerMessage>;

/// What a connection was registered for. Editor rooms and chat groups are
/// separate namespaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Editor,
    Chat,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConnCtx {
    pub conn_id: String,
    pub purpose: Option<Purpose>,
    pub display_name: Option<String>,
    pub participant_id: Option<String>,
}

impl ConnCtx {
    fn bare(conn_id: &str) -> Self {
        Self {
            conn_id: conn_id.to_string(),
            purpose: None,
            display_name: None,
            participant_id: None,
        }
    }
}

struct ConnEntry {
    ctx: ConnCtx,
    sender: Option<ConnectionSender>,
}

/// Live connections of this process, keyed by connection id.
#[derive(Default)]
pub struct ConnectionRegistry {
    conns: HashMap<String, ConnEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the outbound queue of a freshly opened socket.
    pub fn attach(&mut self, conn_id: &str, sender: ConnectionSender) {
        self.conns
            .entry(conn_id.to_string())
            .and_modify(|e| e.sender = Some(sender.clone()))
            .or_insert_with(|| ConnEntry {
                ctx: ConnCtx::bare(conn_id),
                sender: Some(sender),
            });
    }

    /// Store (or overwrite) the metadata of a connection.
    pub fn register(
        &mut self,
        conn_id: &str,
        purpose: Purpose,
        display_name: &str,
        participant_id: &str,
    ) {
        let entry = self
            .conns
            .entry(conn_id.to_string())
            .or_insert_with(|| ConnEntry {
                ctx: ConnCtx::bare(conn_id),
                sender: None,
            });
        entry.ctx.purpose = Some(purpose);
        entry.ctx.display_name = Some(display_name.to_string());
        entry.ctx.participant_id = Some(participant_id.to_string());
        debug!("Registered connection {} for {:?} as {}", conn_id, purpose, display_name);
    }

    pub fn get(&self, conn_id: &str) -> Option<&ConnCtx> {
        self.conns.get(conn_id).map(|e| &e.ctx)
    }

    pub fn contains(&self, conn_id: &str) -> bool {
        self.conns.contains_key(conn_id)
    }

    pub fn remove(&mut self, conn_id: &str) -> Option<ConnCtx> {
        self.conns.remove(conn_id).map(|e| e.ctx)
    }

    /// Push an event to one connection. Returns false when the connection is
    /// unknown or its socket is gone.
    pub fn send(&self, conn_id: &str, message: ServerMessage) -> bool {
        match self.conns.get(conn_id).and_then(|e| e.sender.as_ref()) {
            Some(sender) => sender.send(message).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}
