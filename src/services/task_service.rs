use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::StoreError;
use crate::models::{
    CreateTaskRequest, NewActivity, NewTask, RelayPayload, ServerMessage, TaskRecord, TaskStatus,
};
use crate::services::analytics_service;
use crate::state::AppState;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,

    #[error("You are not authorized to update this task")]
    NotAssigned,

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Activity attributed to the REST caller.
pub fn caller_activity(identity: &Identity, action: impl Into<String>) -> NewActivity {
    match &identity.name {
        Some(name) => NewActivity::named(identity.user_id.clone(), name.clone(), action),
        None => NewActivity::new(identity.user_id.clone(), action),
    }
}

/// Activity text for a status change, attributed to the user who made it.
pub fn status_action(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "completed a task",
        TaskStatus::InProgress => "started a task",
        _ => "updated a task",
    }
}

fn task_relay(task: &TaskRecord, updated_by: &str) -> Result<RelayPayload, StoreError> {
    let mut fields = match serde_json::to_value(task)? {
        Value::Object(fields) => fields,
        _ => serde_json::Map::new(),
    };
    fields.insert("updatedBy".to_string(), Value::String(updated_by.to_string()));
    Ok(RelayPayload { fields })
}

pub async fn create_task(
    state: &Arc<AppState>,
    identity: &Identity,
    group_id: &str,
    request: CreateTaskRequest,
) -> Result<TaskRecord, TaskError> {
    let task = state
        .store
        .create_task(NewTask {
            group_id: group_id.to_string(),
            title: request.title,
            description: request.description,
            assigned_to: request.assigned_to,
            created_by: identity.user_id.clone(),
            deadline: request.deadline,
        })
        .await?;
    info!("Task {} created in group {}", task.id, group_id);
    analytics_service::trigger(state, group_id, Some(caller_activity(identity, "created a task")));
    Ok(task)
}

/// Change the status of a task. Only assignees may do so; completing a task
/// records the caller as completer, any other status clears it.
pub async fn change_status(
    state: &Arc<AppState>,
    identity: &Identity,
    group_id: &str,
    task_id: Uuid,
    status: TaskStatus,
) -> Result<TaskRecord, TaskError> {
    let task = state
        .store
        .find_task(group_id, task_id)
        .await?
        .ok_or(TaskError::NotFound)?;
    if !task.is_assigned_to(&identity.user_id) {
        return Err(TaskError::NotAssigned);
    }

    let completed_by = match status {
        TaskStatus::Completed => Some(identity.user_id.clone()),
        _ => None,
    };
    let task = state
        .store
        .update_task_status(group_id, task_id, status, completed_by)
        .await?
        .ok_or(TaskError::NotFound)?;
    info!("Task {} in group {} is now {}", task.id, group_id, task.status);

    let relay = task_relay(&task, &identity.user_id)?;
    state
        .broadcast_to_group(group_id, ServerMessage::TaskUpdated(relay))
        .await;
    analytics_service::trigger(state, group_id, Some(caller_activity(identity, status_action(status))));
    Ok(task)
}

pub async fn update_progress(
    state: &Arc<AppState>,
    identity: &Identity,
    group_id: &str,
    task_id: Uuid,
    progress: u8,
) -> Result<TaskRecord, TaskError> {
    let task = state
        .store
        .update_task_progress(group_id, task_id, progress)
        .await?
        .ok_or(TaskError::NotFound)?;
    analytics_service::trigger(state, group_id, Some(caller_activity(identity, "updated task progress")));
    Ok(task)
}

pub async fn delete_task(
    state: &Arc<AppState>,
    identity: &Identity,
    group_id: &str,
    task_id: Uuid,
) -> Result<(), TaskError> {
    if !state.store.delete_task(group_id, task_id).await? {
        return Err(TaskError::NotFound);
    }
    info!("Task {} deleted from group {}", task_id, group_id);
    analytics_service::trigger(state, group_id, Some(caller_activity(identity, "deleted a task")));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::MemoryStore;

    fn identity(user_id: &str) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            group_id: Some("G1".to_string()),
            name: None,
            roles: Vec::new(),
        }
    }

    async fn with_task() -> (Arc<AppState>, TaskRecord) {
        let state = AppState::new(Config::default(), Arc::new(MemoryStore::new()));
        let task = create_task(
            &state,
            &identity("u1"),
            "G1",
            CreateTaskRequest {
                title: "Ship it".to_string(),
                description: String::new(),
                assigned_to: vec!["u2".to_string()],
                deadline: None,
            },
        )
        .await
        .unwrap();
        (state, task)
    }

    #[tokio::test]
    async fn only_assignees_change_status() {
        let (state, task) = with_task().await;
        let err = change_status(&state, &identity("u1"), "G1", task.id, TaskStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::NotAssigned));
    }

    #[tokio::test]
    async fn completing_sets_and_reopening_clears_completer() {
        let (state, task) = with_task().await;
        let done = change_status(&state, &identity("u2"), "G1", task.id, TaskStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.completed_by.as_deref(), Some("u2"));

        let reopened = change_status(&state, &identity("u2"), "G1", task.id, TaskStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(reopened.completed_by, None);
        assert_eq!(reopened.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let (state, _) = with_task().await;
        let err = change_status(&state, &identity("u2"), "G1", Uuid::new_v4(), TaskStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::NotFound));
        assert!(matches!(
            delete_task(&state, &identity("u2"), "G1", Uuid::new_v4()).await,
            Err(TaskError::NotFound)
        ));
    }

    #[test]
    fn status_actions_follow_the_new_status() {
        assert_eq!(status_action(TaskStatus::Completed), "completed a task");
        assert_eq!(status_action(TaskStatus::InProgress), "started a task");
        assert_eq!(status_action(TaskStatus::Cancelled), "updated a task");
    }
}
