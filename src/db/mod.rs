//! Storage boundary consumed by the collaboration core.
//!
//! The core only needs a handful of reads and writes from the domain
//! collections; the traits below describe exactly those. [`MemoryStore`]
//! backs tests and single-node development, [`PgStore`] backs production.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AnalyticsSummary, CalendarEventRecord, ChatMessage, FileRecord, NewCalendarEvent,
    NewChatMessage, NewFile, NewTask, TaskRecord, TaskStatus, UserRecord,
};

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn insert_message(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError>;

    /// Messages of a group, oldest first.
    async fn list_messages(&self, group_id: &str) -> Result<Vec<ChatMessage>, StoreError>;
}

#[async_trait]
pub trait DomainStore: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Number of tasks per status.
    async fn task_status_counts(&self, group_id: &str) -> Result<BTreeMap<String, u64>, StoreError>;

    /// Number of files per file type.
    async fn file_type_counts(&self, group_id: &str) -> Result<BTreeMap<String, u64>, StoreError>;

    /// Completed tasks per completing user's display name. Tasks whose
    /// completer is unknown are not counted.
    async fn tasks_completed_by_user(&self, group_id: &str) -> Result<BTreeMap<String, u64>, StoreError>;

    async fn create_task(&self, task: NewTask) -> Result<TaskRecord, StoreError>;

    async fn find_task(&self, group_id: &str, task_id: Uuid) -> Result<Option<TaskRecord>, StoreError>;

    async fn update_task_status(
        &self,
        group_id: &str,
        task_id: Uuid,
        status: TaskStatus,
        completed_by: Option<String>,
    ) -> Result<Option<TaskRecord>, StoreError>;

    async fn update_task_progress(
        &self,
        group_id: &str,
        task_id: Uuid,
        progress: u8,
    ) -> Result<Option<TaskRecord>, StoreError>;

    async fn delete_task(&self, group_id: &str, task_id: Uuid) -> Result<bool, StoreError>;

    async fn insert_file(&self, file: NewFile) -> Result<FileRecord, StoreError>;

    async fn insert_event(&self, event: NewCalendarEvent) -> Result<CalendarEventRecord, StoreError>;
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn load_summary(&self, group_id: &str) -> Result<Option<AnalyticsSummary>, StoreError>;

    /// Create the group's summary or replace the existing one.
    async fn upsert_summary(&self, summary: &AnalyticsSummary) -> Result<(), StoreError>;
}

/// Everything the service needs from storage.
pub trait Store: ChatStore + DomainStore + AnalyticsStore {}

impl<T: ChatStore + DomainStore + AnalyticsStore> Store for T {}
