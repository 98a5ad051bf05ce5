use indexmap::IndexSet;
use std::collections::HashMap;

use super::connctx::Purpose;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoomKey {
    pub purpose: Purpose,
    pub room_id: String,
}

impl RoomKey {
    pub fn new(purpose: Purpose, room_id: &str) -> Self {
        Self {
            purpose,
            room_id: room_id.to_string(),
        }
    }
}

/// Which connections are joined to which editor room or chat group.
///
/// Sets keep insertion order so member listings are stable. A set is dropped
/// as soon as its last member leaves.
#[derive(Default)]
pub struct RoomIndex {
    rooms: HashMap<RoomKey, IndexSet<String>>,
    by_conn: HashMap<String, IndexSet<RoomKey>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the connection was already a member.
    pub fn join(&mut self, purpose: Purpose, room_id: &str, conn_id: &str) -> bool {
        let key = RoomKey::new(purpose, room_id);
        let added = self
            .rooms
            .entry(key.clone())
            .or_default()
            .insert(conn_id.to_string());
        self.by_conn.entry(conn_id.to_string()).or_default().insert(key);
        added
    }

    /// Returns false when the connection was not a member.
    pub fn leave(&mut self, purpose: Purpose, room_id: &str, conn_id: &str) -> bool {
        let key = RoomKey::new(purpose, room_id);
        let removed = match self.rooms.get_mut(&key) {
            Some(members) => {
                let removed = members.shift_remove(conn_id);
                if members.is_empty() {
                    self.rooms.remove(&key);
                }
                removed
            }
            None => false,
        };
        if let Some(keys) = self.by_conn.get_mut(conn_id) {
            keys.shift_remove(&key);
            if keys.is_empty() {
                self.by_conn.remove(conn_id);
            }
        }
        removed
    }

    /// Every room the connection is joined to, in join order.
    pub fn rooms_of(&self, conn_id: &str) -> Vec<RoomKey> {
        self.by_conn
            .get(conn_id)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Member connection ids in join order; empty for unknown rooms.
    pub fn members(&self, purpose: Purpose, room_id: &str) -> Vec<String> {
        self.rooms
            .get(&RoomKey::new(purpose, room_id))
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, purpose: Purpose, room_id: &str, conn_id: &str) -> bool {
        self.rooms
            .get(&RoomKey::new(purpose, room_id))
            .is_some_and(|members| members.contains(conn_id))
    }

    pub fn is_empty_room(&self, purpose: Purpose, room_id: &str) -> bool {
        !self.rooms.contains_key(&RoomKey::new(purpose, room_id))
    }

    pub fn room_count(&self, purpose: Purpose) -> usize {
        self.rooms.keys().filter(|k| k.purpose == purpose).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_then_leave_removes_member_and_empty_set() {
        let mut index = RoomIndex::new();
        assert!(index.join(Purpose::Editor, "abc123", "c1"));
        assert!(!index.join(Purpose::Editor, "abc123", "c1"));
        assert_eq!(index.members(Purpose::Editor, "abc123"), vec!["c1"]);

        assert!(index.leave(Purpose::Editor, "abc123", "c1"));
        assert!(index.members(Purpose::Editor, "abc123").is_empty());
        assert!(index.is_empty_room(Purpose::Editor, "abc123"));
        assert_eq!(index.room_count(Purpose::Editor), 0);
        assert!(index.rooms_of("c1").is_empty());
    }

    #[test]
    fn editor_rooms_and_chat_groups_are_separate_namespaces() {
        let mut index = RoomIndex::new();
        index.join(Purpose::Editor, "x", "c1");
        index.join(Purpose::Chat, "x", "c2");

        assert_eq!(index.members(Purpose::Editor, "x"), vec!["c1"]);
        assert_eq!(index.members(Purpose::Chat, "x"), vec!["c2"]);
        assert!(!index.contains(Purpose::Chat, "x", "c1"));
    }

    #[test]
    fn joining_another_room_does_not_leave_the_first() {
        let mut index = RoomIndex::new();
        index.join(Purpose::Editor, "a", "c1");
        index.join(Purpose::Editor, "b", "c1");

        assert!(index.contains(Purpose::Editor, "a", "c1"));
        assert!(index.contains(Purpose::Editor, "b", "c1"));
        assert_eq!(
            index.rooms_of("c1"),
            vec![RoomKey::new(Purpose::Editor, "a"), RoomKey::new(Purpose::Editor, "b")]
        );
    }

    #[test]
    fn members_keep_insertion_order_after_removal() {
        let mut index = RoomIndex::new();
        for conn in ["c1", "c2", "c3", "c4"] {
            index.join(Purpose::Chat, "G1", conn);
        }
        index.leave(Purpose::Chat, "G1", "c2");
        assert_eq!(index.members(Purpose::Chat, "G1"), vec!["c1", "c3", "c4"]);
    }

    #[test]
    fn unknown_rooms_and_connections_are_no_ops() {
        let mut index = RoomIndex::new();
        assert!(index.members(Purpose::Chat, "nope").is_empty());
        assert!(!index.leave(Purpose::Chat, "nope", "ghost"));
        assert!(index.rooms_of("ghost").is_empty());
    }
}
