use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::connctx::Purpose;
use super::hub::{Delivery, Hub};
use crate::models::ServerMessage;

const CURSOR_COLORS: [&str; 13] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8",
    "#F7DC6F", "#BB8FCE", "#85C1E9", "#F8C471", "#82E0AA", "#F1948A",
];

/// Caret color of a connection. A pure function of the id, so every lookup
/// for the same connection agrees.
pub fn color_for(conn_id: &str) -> &'static str {
    let hash = conn_id
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32));
    CURSOR_COLORS[hash.unsigned_abs() as usize % CURSOR_COLORS.len()]
}

#[derive(Clone, Debug, PartialEq)]
pub struct CursorOverlay {
    pub cursor: Value,
    pub selection: Option<Value>,
    pub color: &'static str,
    pub last_seen: Instant,
}

/// Live state of one editor room. Text is last-write-wins; it is not merged.
#[derive(Default, Debug)]
pub struct EditorDoc {
    pub content: Option<String>,
    pub cursors: HashMap<String, CursorOverlay>,
}

#[derive(Default)]
pub struct EditorSessions {
    docs: HashMap<String, EditorDoc>,
}

impl EditorSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doc(&self, room_id: &str) -> Option<&EditorDoc> {
        self.docs.get(room_id)
    }

    pub fn content(&self, room_id: &str) -> Option<&str> {
        self.docs.get(room_id).and_then(|d| d.content.as_deref())
    }

    pub fn set_content(&mut self, room_id: &str, code: &str) {
        self.docs.entry(room_id.to_string()).or_default().content = Some(code.to_string());
    }

    pub fn upsert_cursor(
        &mut self,
        room_id: &str,
        conn_id: &str,
        cursor: Value,
        selection: Option<Value>,
        now: Instant,
    ) -> &'static str {
        let color = color_for(conn_id);
        self.docs
            .entry(room_id.to_string())
            .or_default()
            .cursors
            .insert(
                conn_id.to_string(),
                CursorOverlay {
                    cursor,
                    selection,
                    color,
                    last_seen: now,
                },
            );
        color
    }

    pub fn remove_cursor(&mut self, room_id: &str, conn_id: &str) {
        if let Some(doc) = self.docs.get_mut(room_id) {
            doc.cursors.remove(conn_id);
        }
    }

    /// Cursors seen within `ttl` of `now`, excluding one connection.
    pub fn live_cursors(
        &self,
        room_id: &str,
        ttl: Duration,
        now: Instant,
        exclude: &str,
    ) -> Vec<(String, CursorOverlay)> {
        self.docs
            .get(room_id)
            .map(|doc| {
                doc.cursors
                    .iter()
                    .filter(|(conn_id, overlay)| {
                        conn_id.as_str() != exclude && now.duration_since(overlay.last_seen) < ttl
                    })
                    .map(|(conn_id, overlay)| (conn_id.clone(), overlay.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop cursor overlays idle for at least `ttl`. Returns how many went.
    pub fn evict_stale(&mut self, ttl: Duration, now: Instant) -> usize {
        let mut evicted = 0;
        for doc in self.docs.values_mut() {
            let before = doc.cursors.len();
            doc.cursors
                .retain(|_, overlay| now.duration_since(overlay.last_seen) < ttl);
            evicted += before - doc.cursors.len();
        }
        evicted
    }

    pub fn drop_room(&mut self, room_id: &str) {
        self.docs.remove(room_id);
    }

    pub fn cursor_count(&self) -> usize {
        self.docs.values().map(|d| d.cursors.len()).sum()
    }
}

impl Hub {
    /// Join an editor room. Every member, the joiner included, gets the new
    /// member list; the joiner also gets the last known text and the live
    /// cursors of the others so it can render the room right away.
    pub fn join_editor(
        &mut self,
        conn_id: &str,
        room_id: &str,
        display_name: &str,
        cursor_ttl: Duration,
        now: Instant,
    ) -> Vec<Delivery> {
        let participant_id = self
            .registry
            .get(conn_id)
            .and_then(|ctx| ctx.participant_id.clone())
            .unwrap_or_else(|| conn_id.to_string());
        self.registry
            .register(conn_id, Purpose::Editor, display_name, &participant_id);
        self.rooms.join(Purpose::Editor, room_id, conn_id);

        let members = self.list_members(Purpose::Editor, room_id);
        let joined = ServerMessage::EditorRoomJoined {
            members: members.clone(),
            display_name: display_name.to_string(),
            conn_id: conn_id.to_string(),
        };
        let mut deliveries: Vec<Delivery> = members
            .iter()
            .map(|m| Delivery::new(m.conn_id.clone(), joined.clone()))
            .collect();

        if members.len() > 1 {
            if let Some(code) = self.editor.content(room_id) {
                deliveries.push(Delivery::new(
                    conn_id,
                    ServerMessage::CodeChange {
                        code: code.to_string(),
                    },
                ));
            }
        }

        for (peer, overlay) in self.editor.live_cursors(room_id, cursor_ttl, now, conn_id) {
            if !self.rooms.contains(Purpose::Editor, room_id, &peer) {
                continue;
            }
            deliveries.push(Delivery::new(
                conn_id,
                ServerMessage::CursorChange {
                    cursor: overlay.cursor,
                    selection: overlay.selection,
                    display_name: self.display_name_of(&peer),
                    conn_id: peer,
                    color: overlay.color.to_string(),
                },
            ));
        }

        info!("{} joined editor room {} ({} members)", display_name, room_id, members.len());
        deliveries
    }

    /// Relay a full-text edit to every other member. Last write wins.
    pub fn propagate_edit(&mut self, conn_id: &str, room_id: &str, code: &str) -> Vec<Delivery> {
        if !self.rooms.contains(Purpose::Editor, room_id, conn_id) {
            debug!("Ignoring edit from {} outside room {}", conn_id, room_id);
            return Vec::new();
        }
        self.editor.set_content(room_id, code);
        self.fan_out(
            Purpose::Editor,
            room_id,
            &ServerMessage::CodeChange {
                code: code.to_string(),
            },
            Some(conn_id),
        )
    }

    /// Point-to-point text sync from an existing member to a new joiner. Both
    /// must share an editor room.
    pub fn sync_content_to(&mut self, conn_id: &str, target_conn_id: &str, code: &str) -> Vec<Delivery> {
        let shared_room = self
            .rooms
            .rooms_of(conn_id)
            .into_iter()
            .filter(|key| key.purpose == Purpose::Editor)
            .find(|key| self.rooms.contains(Purpose::Editor, &key.room_id, target_conn_id));

        match shared_room {
            Some(key) => {
                if self.editor.content(&key.room_id).is_none() {
                    self.editor.set_content(&key.room_id, code);
                }
                vec![Delivery::new(
                    target_conn_id,
                    ServerMessage::CodeChange {
                        code: code.to_string(),
                    },
                )]
            }
            None => {
                debug!("Ignoring sync from {} to {}: no shared room", conn_id, target_conn_id);
                Vec::new()
            }
        }
    }

    /// Relay a cursor/selection move to every other member, tagged with the
    /// sender's id, name and color.
    pub fn propagate_cursor(
        &mut self,
        conn_id: &str,
        room_id: &str,
        cursor: Value,
        selection: Option<Value>,
        now: Instant,
    ) -> Vec<Delivery> {
        if !self.rooms.contains(Purpose::Editor, room_id, conn_id) {
            return Vec::new();
        }
        let color = self
            .editor
            .upsert_cursor(room_id, conn_id, cursor.clone(), selection.clone(), now);
        let message = ServerMessage::CursorChange {
            cursor,
            selection,
            conn_id: conn_id.to_string(),
            display_name: self.display_name_of(conn_id),
            color: color.to_string(),
        };
        self.fan_out(Purpose::Editor, room_id, &message, Some(conn_id))
    }

    /// Leave an editor room; the rest are told to drop the member's caret.
    /// The room's text is discarded with its last member.
    pub fn leave_editor(&mut self, conn_id: &str, room_id: &str) -> Vec<Delivery> {
        if !self.rooms.leave(Purpose::Editor, room_id, conn_id) {
            return Vec::new();
        }
        self.editor.remove_cursor(room_id, conn_id);
        if self.rooms.is_empty_room(Purpose::Editor, room_id) {
            self.editor.drop_room(room_id);
            info!("Editor room {} is empty, session discarded", room_id);
            return Vec::new();
        }
        let message = ServerMessage::Disconnected {
            conn_id: conn_id.to_string(),
            display_name: self.display_name_of(conn_id),
        };
        self.fan_out(Purpose::Editor, room_id, &message, None)
    }
}
