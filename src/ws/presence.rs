use tracing::info;

use super::connctx::Purpose;
use super::hub::{Delivery, Hub};
use crate::models::{MemberInfo, PresenceNotice, ServerMessage};

impl Hub {
    /// Join a chat group: the others hear about it, then everyone in the
    /// group (joiner included) gets the current online-user list.
    pub fn join_group(
        &mut self,
        conn_id: &str,
        group_id: &str,
        participant_id: &str,
        display_name: &str,
    ) -> Vec<Delivery> {
        self.registry
            .register(conn_id, Purpose::Chat, display_name, participant_id);
        self.rooms.join(Purpose::Chat, group_id, conn_id);
        info!("{} ({}) joined group {}", display_name, conn_id, group_id);

        let notice = ServerMessage::UserJoined(PresenceNotice {
            participant_id: participant_id.to_string(),
            display_name: display_name.to_string(),
            message: format!("{} joined the chat", display_name),
        });
        let mut deliveries = self.fan_out(Purpose::Chat, group_id, &notice, Some(conn_id));
        deliveries.extend(self.online_users_push(group_id));
        deliveries
    }

    /// Leave a chat group. Returns the `user-left` events and whether a
    /// delayed online-user push should be scheduled for the group.
    pub fn leave_group(&mut self, conn_id: &str, group_id: &str) -> (Vec<Delivery>, bool) {
        if !self.rooms.leave(Purpose::Chat, group_id, conn_id) {
            return (Vec::new(), false);
        }
        if self.rooms.is_empty_room(Purpose::Chat, group_id) {
            return (Vec::new(), false);
        }

        let (participant_id, display_name) = match self.registry.get(conn_id) {
            Some(ctx) => (
                ctx.participant_id.clone().unwrap_or_else(|| conn_id.to_string()),
                ctx.display_name.clone().unwrap_or_else(|| "Anonymous".to_string()),
            ),
            None => (conn_id.to_string(), "Anonymous".to_string()),
        };
        let notice = ServerMessage::UserLeft(PresenceNotice {
            participant_id,
            message: format!("{} left the chat", display_name),
            display_name,
        });
        let deliveries = self.fan_out(Purpose::Chat, group_id, &notice, None);
        let refresh = self.mark_presence_refresh(group_id);
        (deliveries, refresh)
    }

    /// Typing indicators are relayed to the other members only; senders that
    /// are not in the group are ignored.
    pub fn typing(
        &self,
        conn_id: &str,
        group_id: &str,
        participant_id: &str,
        display_name: &str,
        is_typing: bool,
    ) -> Vec<Delivery> {
        if !self.rooms.contains(Purpose::Chat, group_id, conn_id) {
            return Vec::new();
        }
        let message = ServerMessage::UserTyping {
            participant_id: participant_id.to_string(),
            display_name: display_name.to_string(),
            is_typing,
        };
        self.fan_out(Purpose::Chat, group_id, &message, Some(conn_id))
    }

    pub fn online_users(&self, group_id: &str) -> Vec<MemberInfo> {
        self.list_members(Purpose::Chat, group_id)
    }

    pub fn is_group_member(&self, conn_id: &str, group_id: &str) -> bool {
        self.rooms.contains(Purpose::Chat, group_id, conn_id)
    }

    pub(super) fn online_users_push(&self, group_id: &str) -> Vec<Delivery> {
        let message = ServerMessage::OnlineUsers {
            users: self.online_users(group_id),
        };
        self.fan_out(Purpose::Chat, group_id, &message, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_for<'a>(deliveries: &'a [Delivery], conn: &str) -> Vec<&'a ServerMessage> {
        deliveries.iter().filter(|d| d.to == conn).map(|d| &d.message).collect()
    }

    #[test]
    fn join_notifies_others_and_pushes_online_users_to_all() {
        let mut hub = Hub::new();
        hub.join_group("c1", "G1", "u1", "Ada");
        let deliveries = hub.join_group("c2", "G1", "u2", "Bob");

        let to_c1 = kinds_for(&deliveries, "c1");
        assert!(matches!(to_c1[0], ServerMessage::UserJoined(n) if n.participant_id == "u2"));
        assert!(matches!(to_c1[1], ServerMessage::OnlineUsers { users } if users.len() == 2));

        let to_c2 = kinds_for(&deliveries, "c2");
        assert_eq!(to_c2.len(), 1);
        assert!(matches!(to_c2[0], ServerMessage::OnlineUsers { .. }));
    }

    #[test]
    fn leave_notifies_remaining_and_requests_one_refresh() {
        let mut hub = Hub::new();
        hub.join_group("c1", "G1", "u1", "Ada");
        hub.join_group("c2", "G1", "u2", "Bob");
        hub.join_group("c3", "G1", "u3", "Eve");

        let (deliveries, refresh) = hub.leave_group("c2", "G1");
        assert!(refresh);
        let mut to: Vec<_> = deliveries.iter().map(|d| d.to.as_str()).collect();
        to.sort();
        assert_eq!(to, vec!["c1", "c3"]);
        assert!(matches!(
            &deliveries[0].message,
            ServerMessage::UserLeft(n) if n.message == "Bob left the chat"
        ));

        let (_, refresh) = hub.leave_group("c3", "G1");
        assert!(!refresh, "second disconnect should join the pending refresh");

        let push = hub.take_presence_refresh("G1");
        assert_eq!(push.len(), 1);
        assert!(matches!(
            &push[0].message,
            ServerMessage::OnlineUsers { users } if users.len() == 1 && users[0].participant_id == "u1"
        ));
    }

    #[test]
    fn last_member_leaving_drops_the_group() {
        let mut hub = Hub::new();
        hub.join_group("c1", "G1", "u1", "Ada");
        let (deliveries, refresh) = hub.leave_group("c1", "G1");
        assert!(deliveries.is_empty());
        assert!(!refresh);
        assert!(hub.online_users("G1").is_empty());
    }

    #[test]
    fn typing_is_relayed_to_others_only() {
        let mut hub = Hub::new();
        hub.join_group("c1", "G1", "u1", "Ada");
        hub.join_group("c2", "G1", "u2", "Bob");

        let deliveries = hub.typing("c1", "G1", "u1", "Ada", true);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].to, "c2");
        assert!(hub.typing("c9", "G1", "u9", "Mallory", true).is_empty());
    }

    #[test]
    fn membership_symmetry_after_join_and_leave() {
        let mut hub = Hub::new();
        hub.join_group("c1", "G1", "u1", "Ada");
        hub.join_group("c2", "G1", "u2", "Bob");
        hub.leave_group("c1", "G1");
        assert!(!hub.online_users("G1").iter().any(|m| m.conn_id == "c1"));
        assert!(!hub.is_group_member("c1", "G1"));
    }

    #[test]
    fn disconnect_from_chat_schedules_refresh() {
        let mut hub = Hub::new();
        hub.join_group("c1", "G1", "u1", "Ada");
        hub.join_group("c2", "G1", "u2", "Bob");

        let outcome = hub.disconnect("c2");
        assert_eq!(outcome.refresh_groups, vec!["G1".to_string()]);
        assert_eq!(outcome.deliveries.len(), 1);
        assert_eq!(outcome.deliveries[0].to, "c1");
    }
}
