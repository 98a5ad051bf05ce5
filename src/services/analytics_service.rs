use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{Store, StoreError};
use crate::models::{ActivityEvent, ActivityUser, AnalyticsSummary, NewActivity, ServerMessage};
use crate::state::AppState;

/// Placeholder used when the actor of an activity cannot be resolved.
pub fn placeholder_name(user_id: &str) -> String {
    format!("User ID: {}", user_id)
}

async fn resolve_actor(store: &dyn Store, activity: &NewActivity) -> String {
    if let Some(name) = activity.user_name.as_deref().filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }
    match store.find_user(&activity.user_id).await {
        Ok(Some(user)) => user.name,
        Ok(None) => placeholder_name(&activity.user_id),
        Err(e) => {
            warn!("User lookup for {} failed: {}", activity.user_id, e);
            placeholder_name(&activity.user_id)
        }
    }
}

fn joined_recently(
    recent: &[ActivityEvent],
    user_id: &str,
    lookback: chrono::Duration,
    now: DateTime<Utc>,
) -> bool {
    let since = now - lookback;
    recent
        .iter()
        .any(|a| a.is_join() && a.user.id == user_id && a.timestamp >= since)
}

/// Recount the group's histograms, fold the activity into the rolling log
/// and store the result.
pub async fn compute_summary(
    store: &dyn Store,
    config: &Config,
    group_id: &str,
    activity: Option<NewActivity>,
    now: DateTime<Utc>,
) -> Result<AnalyticsSummary, StoreError> {
    let task_status_counts = store.task_status_counts(group_id).await?;
    let file_type_counts = store.file_type_counts(group_id).await?;
    let tasks_completed_by_user = store.tasks_completed_by_user(group_id).await?;

    let mut recent_activities = store
        .load_summary(group_id)
        .await?
        .map(|s| s.recent_activities)
        .unwrap_or_default();

    if let Some(activity) = activity {
        let name = resolve_actor(store, &activity).await;
        if activity.is_join()
            && joined_recently(&recent_activities, &activity.user_id, config.join_lookback(), now)
        {
            info!("Suppressing repeated join of {} in group {}", name, group_id);
        } else {
            recent_activities.insert(
                0,
                ActivityEvent {
                    user: ActivityUser {
                        id: activity.user_id,
                        name,
                    },
                    action: activity.action,
                    timestamp: now,
                },
            );
        }
    }

    recent_activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent_activities.truncate(config.recent_activity_limit);

    let summary = AnalyticsSummary {
        group_id: group_id.to_string(),
        task_status_counts,
        file_type_counts,
        tasks_completed_by_user,
        recent_activities,
        last_updated: now,
    };
    store.upsert_summary(&summary).await?;
    Ok(summary)
}

/// Recompute and broadcast the group's summary. Failures are logged and
/// never reach the caller.
pub async fn recompute(
    state: &AppState,
    group_id: &str,
    activity: Option<NewActivity>,
) -> Option<AnalyticsSummary> {
    let _guard = state.analytics_lock.lock().await;
    match compute_summary(state.store.as_ref(), &state.config, group_id, activity, Utc::now()).await {
        Ok(summary) => {
            let sent = state
                .broadcast_to_group(group_id, ServerMessage::AnalyticsUpdate(summary.clone()))
                .await;
            info!("Analytics for group {} updated, broadcast to {} connections", group_id, sent);
            Some(summary)
        }
        Err(e) => {
            error!("Failed to update analytics for group {}: {}", group_id, e);
            None
        }
    }
}

/// Fire-and-forget recompute.
pub fn trigger(state: &Arc<AppState>, group_id: &str, activity: Option<NewActivity>) {
    let state = Arc::clone(state);
    let group_id = group_id.to_string();
    tokio::spawn(async move {
        recompute(&state, &group_id, activity).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DomainStore, MemoryStore};
    use crate::models::{NewTask, TaskStatus, UserRecord, JOINED_GROUP_ACTION};

    fn join(user_id: &str) -> Option<NewActivity> {
        Some(NewActivity::named(user_id, "Ada", JOINED_GROUP_ACTION))
    }

    fn joins_of(summary: &AnalyticsSummary, user_id: &str) -> usize {
        summary
            .recent_activities
            .iter()
            .filter(|a| a.is_join() && a.user.id == user_id)
            .count()
    }

    #[tokio::test]
    async fn repeated_join_within_lookback_is_logged_once() {
        let store = MemoryStore::new();
        let config = Config::default();
        let now = Utc::now();

        compute_summary(&store, &config, "G1", join("u1"), now).await.unwrap();
        let later = now + chrono::Duration::minutes(5);
        let summary = compute_summary(&store, &config, "G1", join("u1"), later).await.unwrap();

        assert_eq!(joins_of(&summary, "u1"), 1);
        assert_eq!(summary.last_updated, later);
    }

    #[tokio::test]
    async fn join_after_lookback_is_logged_again() {
        let store = MemoryStore::new();
        let config = Config::default();
        let now = Utc::now();

        compute_summary(&store, &config, "G1", join("u1"), now).await.unwrap();
        let later = now + chrono::Duration::minutes(61);
        let summary = compute_summary(&store, &config, "G1", join("u1"), later).await.unwrap();
        assert_eq!(joins_of(&summary, "u1"), 2);
    }

    #[tokio::test]
    async fn rolling_log_is_bounded_and_newest_first() {
        let store = MemoryStore::new();
        let config = Config::default();
        let start = Utc::now();

        let mut summary = None;
        for i in 0..15 {
            let at = start + chrono::Duration::seconds(i);
            let activity = NewActivity::named("u1", "Ada", format!("action {}", i));
            summary = Some(compute_summary(&store, &config, "G1", Some(activity), at).await.unwrap());
        }
        let summary = summary.unwrap();
        assert_eq!(summary.recent_activities.len(), 10);
        assert_eq!(summary.recent_activities[0].action, "action 14");
        assert!(summary
            .recent_activities
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[tokio::test]
    async fn completed_task_counts_toward_completer_name() {
        let store = MemoryStore::new();
        store
            .insert_user(UserRecord {
                id: "u2".to_string(),
                group_id: "G1".to_string(),
                name: "Bob".to_string(),
                role: "member".to_string(),
            })
            .await;
        let task = store
            .create_task(NewTask {
                group_id: "G1".to_string(),
                title: "Ship it".to_string(),
                description: String::new(),
                assigned_to: vec!["u2".to_string()],
                created_by: "u1".to_string(),
                deadline: None,
            })
            .await
            .unwrap();
        let config = Config::default();
        let before = compute_summary(&store, &config, "G1", None, Utc::now()).await.unwrap();
        assert_eq!(before.tasks_completed_by_user.get("Bob"), None);

        store
            .update_task_status("G1", task.id, TaskStatus::Completed, Some("u2".to_string()))
            .await
            .unwrap();
        let now = Utc::now();
        let activity = NewActivity::new("u2", "completed a task");
        let after = compute_summary(&store, &config, "G1", Some(activity), now).await.unwrap();

        assert_eq!(after.tasks_completed_by_user.get("Bob"), Some(&1));
        assert_eq!(after.task_status_counts.get("completed"), Some(&1));
        assert_eq!(after.last_updated, now);
        assert_eq!(after.recent_activities[0].user.name, "Bob");
    }

    #[tokio::test]
    async fn unknown_actor_gets_placeholder_name() {
        let store = MemoryStore::new();
        let config = Config::default();
        let summary = compute_summary(
            &store,
            &config,
            "G1",
            Some(NewActivity::new("ghost", "sent a message")),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(summary.recent_activities[0].user.name, "User ID: ghost");
    }

    #[tokio::test]
    async fn recompute_swallows_store_failures() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_analytics(true);
        let state = AppState::new(Config::default(), store);
        let result = recompute(&state, "G1", Some(NewActivity::new("u1", "created a task"))).await;
        assert!(result.is_none());
    }
}
