use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AnalyticsStore, ChatStore, DomainStore, StoreError};
use crate::models::{
    AnalyticsSummary, CalendarEventRecord, ChatMessage, FileRecord, NewCalendarEvent,
    NewChatMessage, NewFile, NewTask, TaskRecord, TaskStatus, UserRecord,
};

#[derive(Default)]
struct MemoryData {
    users: HashMap<String, UserRecord>,
    tasks: Vec<TaskRecord>,
    files: Vec<FileRecord>,
    events: Vec<CalendarEventRecord>,
    messages: Vec<ChatMessage>,
    summaries: HashMap<String, AnalyticsSummary>,
}

/// Process-local store. Used when no database is configured and in tests,
/// where the failure switches simulate an unavailable backend.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
    fail_chat: AtomicBool,
    fail_analytics: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserRecord) {
        self.data.write().await.users.insert(user.id.clone(), user);
    }

    /// Make every chat write fail.
    pub fn set_fail_chat(&self, fail: bool) {
        self.fail_chat.store(fail, Ordering::SeqCst);
    }

    /// Make every analytics read and write fail.
    pub fn set_fail_analytics(&self, fail: bool) {
        self.fail_analytics.store(fail, Ordering::SeqCst);
    }

    fn check_analytics(&self) -> Result<(), StoreError> {
        if self.fail_analytics.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("analytics collection offline".to_string()));
        }
        Ok(())
    }
}

fn count_by<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert_message(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        if self.fail_chat.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("messages collection offline".to_string()));
        }
        let stored = ChatMessage {
            id: Uuid::new_v4(),
            group_id: message.group_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            text: message.text,
            timestamp: Utc::now(),
        };
        self.data.write().await.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, group_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let data = self.data.read().await;
        let mut messages: Vec<ChatMessage> = data
            .messages
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }
}

#[async_trait]
impl DomainStore for MemoryStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.data.read().await.users.get(user_id).cloned())
    }

    async fn task_status_counts(&self, group_id: &str) -> Result<BTreeMap<String, u64>, StoreError> {
        self.check_analytics()?;
        let data = self.data.read().await;
        Ok(count_by(
            data.tasks
                .iter()
                .filter(|t| t.group_id == group_id)
                .map(|t| t.status.as_str()),
        ))
    }

    async fn file_type_counts(&self, group_id: &str) -> Result<BTreeMap<String, u64>, StoreError> {
        self.check_analytics()?;
        let data = self.data.read().await;
        Ok(count_by(
            data.files
                .iter()
                .filter(|f| f.group_id == group_id)
                .map(|f| f.file_type.as_str()),
        ))
    }

    async fn tasks_completed_by_user(&self, group_id: &str) -> Result<BTreeMap<String, u64>, StoreError> {
        self.check_analytics()?;
        let data = self.data.read().await;
        Ok(count_by(
            data.tasks
                .iter()
                .filter(|t| t.group_id == group_id && t.status == TaskStatus::Completed)
                .filter_map(|t| t.completed_by.as_ref())
                .filter_map(|uid| data.users.get(uid))
                .map(|u| u.name.as_str()),
        ))
    }

    async fn create_task(&self, task: NewTask) -> Result<TaskRecord, StoreError> {
        if task.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("task title is required".to_string()));
        }
        let now = Utc::now();
        let record = TaskRecord {
            id: Uuid::new_v4(),
            group_id: task.group_id,
            title: task.title.trim().to_string(),
            description: task.description,
            assigned_to: task.assigned_to,
            status: TaskStatus::Pending,
            progress: 0,
            created_by: task.created_by,
            completed_by: None,
            deadline: task.deadline,
            created_at: now,
            updated_at: now,
        };
        self.data.write().await.tasks.push(record.clone());
        Ok(record)
    }

    async fn find_task(&self, group_id: &str, task_id: Uuid) -> Result<Option<TaskRecord>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .tasks
            .iter()
            .find(|t| t.id == task_id && t.group_id == group_id)
            .cloned())
    }

    async fn update_task_status(
        &self,
        group_id: &str,
        task_id: Uuid,
        status: TaskStatus,
        completed_by: Option<String>,
    ) -> Result<Option<TaskRecord>, StoreError> {
        let mut data = self.data.write().await;
        Ok(data
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.group_id == group_id)
            .map(|t| {
                t.status = status;
                t.completed_by = completed_by;
                t.updated_at = Utc::now();
                t.clone()
            }))
    }

    async fn update_task_progress(
        &self,
        group_id: &str,
        task_id: Uuid,
        progress: u8,
    ) -> Result<Option<TaskRecord>, StoreError> {
        if progress > 100 {
            return Err(StoreError::InvalidInput(format!("progress {} is above 100", progress)));
        }
        let mut data = self.data.write().await;
        Ok(data
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.group_id == group_id)
            .map(|t| {
                t.progress = progress;
                t.updated_at = Utc::now();
                t.clone()
            }))
    }

    async fn delete_task(&self, group_id: &str, task_id: Uuid) -> Result<bool, StoreError> {
        let mut data = self.data.write().await;
        let before = data.tasks.len();
        data.tasks.retain(|t| !(t.id == task_id && t.group_id == group_id));
        Ok(data.tasks.len() != before)
    }

    async fn insert_file(&self, file: NewFile) -> Result<FileRecord, StoreError> {
        let record = FileRecord {
            id: Uuid::new_v4(),
            group_id: file.group_id,
            file_name: file.file_name,
            file_type: file.file_type,
            storage_key: file.storage_key,
            uploaded_by: file.uploaded_by,
            size: file.size,
            uploaded_at: Utc::now(),
        };
        self.data.write().await.files.push(record.clone());
        Ok(record)
    }

    async fn insert_event(&self, event: NewCalendarEvent) -> Result<CalendarEventRecord, StoreError> {
        let record = CalendarEventRecord {
            id: Uuid::new_v4(),
            group_id: event.group_id,
            title: event.title,
            description: event.description,
            start: event.start,
            end: event.end,
            created_by: event.created_by,
            created_at: Utc::now(),
        };
        self.data.write().await.events.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn load_summary(&self, group_id: &str) -> Result<Option<AnalyticsSummary>, StoreError> {
        self.check_analytics()?;
        Ok(self.data.read().await.summaries.get(group_id).cloned())
    }

    async fn upsert_summary(&self, summary: &AnalyticsSummary) -> Result<(), StoreError> {
        self.check_analytics()?;
        self.data
            .write()
            .await
            .summaries
            .insert(summary.group_id.clone(), summary.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            group_id: "G1".to_string(),
            name: name.to_string(),
            role: "member".to_string(),
        }
    }

    fn new_task(group: &str) -> NewTask {
        NewTask {
            group_id: group.to_string(),
            title: "Write docs".to_string(),
            description: String::new(),
            assigned_to: vec!["u2".to_string()],
            created_by: "u1".to_string(),
            deadline: None,
        }
    }

    #[tokio::test]
    async fn histograms_are_scoped_to_the_group() {
        let store = MemoryStore::new();
        store.insert_user(user("u2", "Bob")).await;
        let t1 = store.create_task(new_task("G1")).await.unwrap();
        store.create_task(new_task("G1")).await.unwrap();
        store.create_task(new_task("G2")).await.unwrap();
        store
            .update_task_status("G1", t1.id, TaskStatus::Completed, Some("u2".to_string()))
            .await
            .unwrap();

        let statuses = store.task_status_counts("G1").await.unwrap();
        assert_eq!(statuses.get("pending"), Some(&1));
        assert_eq!(statuses.get("completed"), Some(&1));

        let by_user = store.tasks_completed_by_user("G1").await.unwrap();
        assert_eq!(by_user.get("Bob"), Some(&1));
        assert!(store.tasks_completed_by_user("G2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completions_by_unknown_users_are_not_counted() {
        let store = MemoryStore::new();
        let t = store.create_task(new_task("G1")).await.unwrap();
        store
            .update_task_status("G1", t.id, TaskStatus::Completed, Some("ghost".to_string()))
            .await
            .unwrap();
        assert!(store.tasks_completed_by_user("G1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn task_lookups_respect_group_boundaries() {
        let store = MemoryStore::new();
        let t = store.create_task(new_task("G1")).await.unwrap();
        assert!(store.find_task("G2", t.id).await.unwrap().is_none());
        assert!(!store.delete_task("G2", t.id).await.unwrap());
        assert!(store.delete_task("G1", t.id).await.unwrap());
        assert!(store.find_task("G1", t.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failure_switches_reject_operations() {
        let store = MemoryStore::new();
        store.set_fail_chat(true);
        let err = store
            .insert_message(NewChatMessage {
                group_id: "G1".to_string(),
                sender_id: "u1".to_string(),
                receiver_id: None,
                text: "hello".to_string(),
            })
            .await;
        assert!(matches!(err, Err(StoreError::Unavailable(_))));
        assert!(store.list_messages("G1").await.unwrap().is_empty());

        store.set_fail_analytics(true);
        assert!(store.load_summary("G1").await.is_err());
        assert!(store.task_status_counts("G1").await.is_err());
    }

    #[tokio::test]
    async fn progress_above_hundred_is_invalid() {
        let store = MemoryStore::new();
        let t = store.create_task(new_task("G1")).await.unwrap();
        assert!(matches!(
            store.update_task_progress("G1", t.id, 101).await,
            Err(StoreError::InvalidInput(_))
        ));
        let updated = store.update_task_progress("G1", t.id, 40).await.unwrap().unwrap();
        assert_eq!(updated.progress, 40);
    }
}
