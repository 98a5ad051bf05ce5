use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use super::{AnalyticsStore, ChatStore, DomainStore, StoreError};
use crate::models::{
    AnalyticsSummary, CalendarEventRecord, ChatMessage, FileRecord, NewCalendarEvent,
    NewChatMessage, NewFile, NewTask, TaskRecord, TaskStatus, UserRecord,
};

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        group_id TEXT NOT NULL,
        name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'member'
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id UUID PRIMARY KEY,
        group_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        assigned_to TEXT[] NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'pending',
        progress SMALLINT NOT NULL DEFAULT 0,
        created_by TEXT NOT NULL,
        completed_by TEXT,
        deadline TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE INDEX IF NOT EXISTS tasks_group_idx ON tasks (group_id);

    CREATE TABLE IF NOT EXISTS files (
        id UUID PRIMARY KEY,
        group_id TEXT NOT NULL,
        file_name TEXT NOT NULL,
        file_type TEXT NOT NULL,
        storage_key TEXT NOT NULL,
        uploaded_by TEXT NOT NULL,
        size BIGINT NOT NULL DEFAULT 0,
        uploaded_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE INDEX IF NOT EXISTS files_group_idx ON files (group_id);

    CREATE TABLE IF NOT EXISTS calendar_events (
        id UUID PRIMARY KEY,
        group_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        start_at TIMESTAMPTZ NOT NULL,
        end_at TIMESTAMPTZ,
        created_by TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );

    CREATE TABLE IF NOT EXISTS messages (
        id UUID PRIMARY KEY,
        group_id TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        receiver_id TEXT,
        text TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE INDEX IF NOT EXISTS messages_group_idx ON messages (group_id, timestamp);

    CREATE TABLE IF NOT EXISTS analytics (
        group_id TEXT PRIMARY KEY,
        summary JSONB NOT NULL,
        last_updated TIMESTAMPTZ NOT NULL
    );
"#;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    group_id: String,
    name: String,
    role: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: row.id,
            group_id: row.group_id,
            name: row.name,
            role: row.role,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    group_id: String,
    title: String,
    description: String,
    assigned_to: Vec<String>,
    status: String,
    progress: i16,
    created_by: String,
    completed_by: Option<String>,
    deadline: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status: TaskStatus = row.status.parse().map_err(StoreError::InvalidInput)?;
        Ok(TaskRecord {
            id: row.id,
            group_id: row.group_id,
            title: row.title,
            description: row.description,
            assigned_to: row.assigned_to,
            status,
            progress: row.progress.clamp(0, 100) as u8,
            created_by: row.created_by,
            completed_by: row.completed_by,
            deadline: row.deadline,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    group_id: String,
    file_name: String,
    file_type: String,
    storage_key: String,
    uploaded_by: String,
    size: i64,
    uploaded_at: DateTime<Utc>,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        FileRecord {
            id: row.id,
            group_id: row.group_id,
            file_name: row.file_name,
            file_type: row.file_type,
            storage_key: row.storage_key,
            uploaded_by: row.uploaded_by,
            size: row.size,
            uploaded_at: row.uploaded_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CalendarEventRow {
    id: Uuid,
    group_id: String,
    title: String,
    description: String,
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<CalendarEventRow> for CalendarEventRecord {
    fn from(row: CalendarEventRow) -> Self {
        CalendarEventRecord {
            id: row.id,
            group_id: row.group_id,
            title: row.title,
            description: row.description,
            start: row.start_at,
            end: row.end_at,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    group_id: String,
    sender_id: String,
    receiver_id: Option<String>,
    text: String,
    timestamp: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: row.id,
            group_id: row.group_id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            text: row.text,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CountRow {
    key: String,
    count: i64,
}

fn into_histogram(rows: Vec<CountRow>) -> BTreeMap<String, u64> {
    rows.into_iter()
        .map(|row| (row.key, row.count.max(0) as u64))
        .collect()
}

/// PostgreSQL-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create the connection pool and make sure the tables exist.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        if let Err(e) = sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await {
            error!("Failed to bootstrap schema: {}", e);
            return Err(e.into());
        }
        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn insert_message(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, group_id, sender_id, receiver_id, text, timestamp)
            VALUES ($1, $2, $3, $4, $5, now())
            RETURNING id, group_id, sender_id, receiver_id, text, timestamp
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&message.group_id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.text)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_messages(&self, group_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, group_id, sender_id, receiver_id, text, timestamp
            FROM messages
            WHERE group_id = $1
            ORDER BY timestamp ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }
}

const TASK_COLUMNS: &str = "id, group_id, title, description, assigned_to, status, progress, \
     created_by, completed_by, deadline, created_at, updated_at";

#[async_trait]
impl DomainStore for PgStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, group_id, name, role FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn task_status_counts(&self, group_id: &str) -> Result<BTreeMap<String, u64>, StoreError> {
        let rows = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT status AS key, COUNT(*) AS count
            FROM tasks
            WHERE group_id = $1
            GROUP BY status
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(into_histogram(rows))
    }

    async fn file_type_counts(&self, group_id: &str) -> Result<BTreeMap<String, u64>, StoreError> {
        let rows = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT file_type AS key, COUNT(*) AS count
            FROM files
            WHERE group_id = $1
            GROUP BY file_type
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(into_histogram(rows))
    }

    async fn tasks_completed_by_user(&self, group_id: &str) -> Result<BTreeMap<String, u64>, StoreError> {
        let rows = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT u.name AS key, COUNT(*) AS count
            FROM tasks t
                JOIN users u ON u.id = t.completed_by
            WHERE t.group_id = $1 AND t.status = 'completed'
            GROUP BY u.name
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(into_histogram(rows))
    }

    async fn create_task(&self, task: NewTask) -> Result<TaskRecord, StoreError> {
        if task.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("task title is required".to_string()));
        }
        let sql = format!(
            r#"
            INSERT INTO tasks (id, group_id, title, description, assigned_to, created_by, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&task.group_id)
            .bind(task.title.trim())
            .bind(&task.description)
            .bind(&task.assigned_to)
            .bind(&task.created_by)
            .bind(task.deadline)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find_task(&self, group_id: &str, task_id: Uuid) -> Result<Option<TaskRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE group_id = $1 AND id = $2",
            TASK_COLUMNS
        );
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(group_id)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .map(TaskRecord::try_from)
            .transpose()
    }

    async fn update_task_status(
        &self,
        group_id: &str,
        task_id: Uuid,
        status: TaskStatus,
        completed_by: Option<String>,
    ) -> Result<Option<TaskRecord>, StoreError> {
        let sql = format!(
            r#"
            UPDATE tasks
            SET status = $3, completed_by = $4, updated_at = now()
            WHERE group_id = $1 AND id = $2
            RETURNING {}
            "#,
            TASK_COLUMNS
        );
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(group_id)
            .bind(task_id)
            .bind(status.as_str())
            .bind(completed_by)
            .fetch_optional(&self.pool)
            .await?
            .map(TaskRecord::try_from)
            .transpose()
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
        let sql = format!(
            r#"
            UPDATE tasks
            SET progress = $3, updated_at = now()
            WHERE group_id = $1 AND id = $2
            RETURNING {}
            "#,
            TASK_COLUMNS
        );
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(group_id)
            .bind(task_id)
            .bind(progress as i16)
            .fetch_optional(&self.pool)
            .await?
            .map(TaskRecord::try_from)
            .transpose()
    }

    async fn delete_task(&self, group_id: &str, task_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE group_id = $1 AND id = $2")
            .bind(group_id)
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_file(&self, file: NewFile) -> Result<FileRecord, StoreError> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO files (id, group_id, file_name, file_type, storage_key, uploaded_by, size)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, group_id, file_name, file_type, storage_key, uploaded_by, size, uploaded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&file.group_id)
        .bind(&file.file_name)
        .bind(&file.file_type)
        .bind(&file.storage_key)
        .bind(&file.uploaded_by)
        .bind(file.size)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn insert_event(&self, event: NewCalendarEvent) -> Result<CalendarEventRecord, StoreError> {
        let row = sqlx::query_as::<_, CalendarEventRow>(
            r#"
            INSERT INTO calendar_events (id, group_id, title, description, start_at, end_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, group_id, title, description, start_at, end_at, created_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&event.group_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start)
        .bind(event.end)
        .bind(&event.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl AnalyticsStore for PgStore {
    async fn load_summary(&self, group_id: &str) -> Result<Option<AnalyticsSummary>, StoreError> {
        let row: Option<(Json<AnalyticsSummary>,)> =
            sqlx::query_as("SELECT summary FROM analytics WHERE group_id = $1")
                .bind(group_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(Json(summary),)| summary))
    }

    async fn upsert_summary(&self, summary: &AnalyticsSummary) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO analytics (group_id, summary, last_updated)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id)
            DO UPDATE SET summary = EXCLUDED.summary, last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&summary.group_id)
        .bind(Json(summary))
        .bind(summary.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
