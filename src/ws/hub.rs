use std::collections::HashSet;
use tracing::{debug, info};

use super::connctx::{ConnectionRegistry, ConnectionSender, Purpose};
use super::docsession::EditorSessions;
use super::rooms::RoomIndex;
use crate::models::{MemberInfo, ServerMessage};

/// One event addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: String,
    pub message: ServerMessage,
}

impl Delivery {
    pub fn new(to: impl Into<String>, message: ServerMessage) -> Self {
        Self {
            to: to.into(),
            message,
        }
    }
}

/// What a disconnect produced: events for the remaining peers, and the chat
/// groups whose online-user list must be pushed once the registry settles.
#[derive(Debug, Default)]
pub struct DisconnectOutcome {
    pub deliveries: Vec<Delivery>,
    pub refresh_groups: Vec<String>,
}

/// All in-memory coordination state of the process.
///
/// Operations mutate the state and return the events to send. They never
/// await, so a mutation and the recipient list built from it are consistent.
#[derive(Default)]
pub struct Hub {
    pub registry: ConnectionRegistry,
    pub rooms: RoomIndex,
    pub editor: EditorSessions,
    pending_refresh: HashSet<String>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, conn_id: &str, sender: ConnectionSender) {
        self.registry.attach(conn_id, sender);
        debug!("Connection {} attached ({} live)", conn_id, self.registry.len());
    }

    /// Members of a room, in join order. Connections without a display name
    /// or registered for the other purpose are left out.
    pub fn list_members(&self, purpose: Purpose, room_id: &str) -> Vec<MemberInfo> {
        self.rooms
            .members(purpose, room_id)
            .into_iter()
            .filter_map(|conn_id| {
                let ctx = self.registry.get(&conn_id)?;
                if ctx.purpose != Some(purpose) {
                    return None;
                }
                let display_name = ctx.display_name.clone()?;
                Some(MemberInfo {
                    participant_id: ctx.participant_id.clone().unwrap_or_else(|| conn_id.clone()),
                    conn_id,
                    display_name,
                })
            })
            .collect()
    }

    /// The same event for every member of a room, optionally skipping one.
    pub fn fan_out(
        &self,
        purpose: Purpose,
        room_id: &str,
        message: &ServerMessage,
        exclude: Option<&str>,
    ) -> Vec<Delivery> {
        self.rooms
            .members(purpose, room_id)
            .into_iter()
            .filter(|conn_id| Some(conn_id.as_str()) != exclude)
            .map(|conn_id| Delivery::new(conn_id, message.clone()))
            .collect()
    }

    /// Push deliveries to their connections. Returns how many were queued.
    pub fn deliver(&self, deliveries: Vec<Delivery>) -> usize {
        deliveries
            .into_iter()
            .filter(|d| self.registry.send(&d.to, d.message.clone()))
            .count()
    }

    pub fn display_name_of(&self, conn_id: &str) -> String {
        self.registry
            .get(conn_id)
            .and_then(|ctx| ctx.display_name.clone())
            .unwrap_or_else(|| "Anonymous".to_string())
    }

    /// Flag a group for a delayed online-user push. Returns false when a push
    /// is already pending, so rapid disconnects are coalesced.
    pub fn mark_presence_refresh(&mut self, group_id: &str) -> bool {
        self.pending_refresh.insert(group_id.to_string())
    }

    /// Clear the pending flag and build the online-user push for the group.
    pub fn take_presence_refresh(&mut self, group_id: &str) -> Vec<Delivery> {
        self.pending_refresh.remove(group_id);
        self.online_users_push(group_id)
    }

    /// Remove a connection from every room it joined and forget it.
    pub fn disconnect(&mut self, conn_id: &str) -> DisconnectOutcome {
        let mut outcome = DisconnectOutcome::default();
        if !self.registry.contains(conn_id) {
            return outcome;
        }

        for key in self.rooms.rooms_of(conn_id) {
            match key.purpose {
                Purpose::Editor => {
                    outcome
                        .deliveries
                        .extend(self.leave_editor(conn_id, &key.room_id));
                }
                Purpose::Chat => {
                    let (deliveries, refresh) = self.leave_group(conn_id, &key.room_id);
                    outcome.deliveries.extend(deliveries);
                    if refresh {
                        outcome.refresh_groups.push(key.room_id.clone());
                    }
                }
            }
        }

        self.registry.remove(conn_id);
        info!("Connection {} removed ({} live)", conn_id, self.registry.len());
        outcome
    }
}
