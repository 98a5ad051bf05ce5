use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Action text recorded when a participant joins a group.
pub const JOINED_GROUP_ACTION: &str = "joined the group";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct ActivityUser {
    pub id: String,
    pub name: String,
}

/// One entry of a group's rolling activity log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct ActivityEvent {
    pub user: ActivityUser,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn is_join(&self) -> bool {
        self.action == JOINED_GROUP_ACTION
    }
}

/// An activity reported by a trigger point. The actor name is resolved by
/// the aggregator when it is not known to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub user_id: String,
    pub user_name: Option<String>,
    pub action: String,
}

impl NewActivity {
    pub fn new(user_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: None,
            action: action.into(),
        }
    }

    pub fn named(user_id: impl Into<String>, user_name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: Some(user_name.into()),
            action: action.into(),
        }
    }

    pub fn is_join(&self) -> bool {
        self.action == JOINED_GROUP_ACTION
    }
}

/// Derived per-group summary, one per group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub group_id: String,
    pub task_status_counts: BTreeMap<String, u64>,
    pub file_type_counts: BTreeMap<String, u64>,
    pub tasks_completed_by_user: BTreeMap<String, u64>,
    /// Newest first.
    pub recent_activities: Vec<ActivityEvent>,
    pub last_updated: DateTime<Utc>,
}

