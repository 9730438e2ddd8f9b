//! Append-only conversation log for analytics and audit
//!
//! Every message is recorded here as a second, best-effort write after the
//! session snapshot is saved. The log is never on the primary conversation
//! path: inserts are dispatched to background tasks, failures are logged
//! and swallowed, and no ordering is guaranteed relative to session-store
//! writes; under partial failure either store may be missing entries the
//! other has.

use crate::error::{Error, Result};
use atelier_llm::MessageRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// One logged conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Record ID
    pub id: Uuid,
    /// User identity
    pub user_id: String,
    /// "user" or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
    /// Channel the turn arrived/left on
    pub channel: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl ConversationRecord {
    /// Create a record stamped with the current time
    #[must_use]
    pub fn new(user_id: &str, role: MessageRole, content: &str, channel: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            role: role.as_str().to_string(),
            content: content.to_string(),
            channel: channel.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate counters over a time window
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LogStats {
    /// Messages recorded in the window
    pub messages: u64,
    /// Distinct users seen in the window
    pub unique_users: u64,
}

/// Trait for conversation log backends
#[async_trait::async_trait]
pub trait EventLog: Send + Sync {
    /// Append a record
    async fn insert(&self, record: &ConversationRecord) -> Result<()>;

    /// Most recent records, newest first
    async fn recent(&self, limit: u32) -> Result<Vec<ConversationRecord>>;

    /// Counters since a cutoff timestamp
    async fn stats_since(&self, cutoff: DateTime<Utc>) -> Result<LogStats>;
}

/// SQLite-backed conversation log
#[derive(Clone)]
pub struct SqliteEventLog {
    pool: SqlitePool,
}

impl SqliteEventLog {
    /// Create a log from a database path, creating the file and schema as
    /// needed.
    pub async fn from_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::EventLog(format!("failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| Error::EventLog(e.to_string()))?;

        let log = Self { pool };
        log.run_migrations().await?;

        info!("SQLite event log initialized at {}", db_path.display());
        Ok(log)
    }

    /// Create an in-memory log (for testing)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::EventLog(e.to_string()))?;

        let log = Self { pool };
        log.run_migrations().await?;

        debug!("In-memory SQLite event log initialized");
        Ok(log)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                channel TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::EventLog(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_conversations_timestamp
            ON conversations(timestamp DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::EventLog(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_conversations_user
            ON conversations(user_id)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::EventLog(e.to_string()))?;

        debug!("Event log migrations completed");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationRecord> {
        let id: String = row.get("id");
        let timestamp: String = row.get("timestamp");

        Ok(ConversationRecord {
            id: Uuid::parse_str(&id).map_err(|e| Error::EventLog(e.to_string()))?,
            user_id: row.get("user_id"),
            role: row.get("role"),
            content: row.get("content"),
            channel: row.get("channel"),
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| Error::EventLog(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait::async_trait]
impl EventLog for SqliteEventLog {
    async fn insert(&self, record: &ConversationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, role, content, channel, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.user_id)
        .bind(&record.role)
        .bind(&record.content)
        .bind(&record.channel)
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::EventLog(e.to_string()))?;

        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<ConversationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, role, content, channel, timestamp
            FROM conversations
            ORDER BY timestamp DESC, rowid DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::EventLog(e.to_string()))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn stats_since(&self, cutoff: DateTime<Utc>) -> Result<LogStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS messages, COUNT(DISTINCT user_id) AS unique_users
            FROM conversations
            WHERE timestamp >= $1
            "#,
        )
        .bind(cutoff.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::EventLog(e.to_string()))?;

        let messages: i64 = row.get("messages");
        let unique_users: i64 = row.get("unique_users");

        Ok(LogStats {
            messages: messages as u64,
            unique_users: unique_users as u64,
        })
    }
}

/// In-memory conversation log (for testing)
#[derive(Default)]
pub struct MemoryEventLog {
    records: std::sync::Mutex<Vec<ConversationRecord>>,
}

impl MemoryEventLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EventLog for MemoryEventLog {
    async fn insert(&self, record: &ConversationRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<ConversationRecord>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn stats_since(&self, cutoff: DateTime<Utc>) -> Result<LogStats> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let in_window: Vec<_> = records.iter().filter(|r| r.timestamp >= cutoff).collect();
        let mut users: Vec<&str> = in_window.iter().map(|r| r.user_id.as_str()).collect();
        users.sort_unstable();
        users.dedup();

        Ok(LogStats {
            messages: in_window.len() as u64,
            unique_users: users.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_insert_and_recent() {
        let log = SqliteEventLog::in_memory().await.unwrap();

        log.insert(&ConversationRecord::new("u1", MessageRole::User, "hello", "web"))
            .await
            .unwrap();
        log.insert(&ConversationRecord::new(
            "u1",
            MessageRole::Assistant,
            "hi there",
            "web",
        ))
        .await
        .unwrap();

        let records = log.recent(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].role, "assistant"); // newest first
        assert_eq!(records[1].content, "hello");
    }

    #[tokio::test]
    async fn test_sqlite_stats_since() {
        let log = SqliteEventLog::in_memory().await.unwrap();

        log.insert(&ConversationRecord::new("u1", MessageRole::User, "a", "web"))
            .await
            .unwrap();
        log.insert(&ConversationRecord::new("u2", MessageRole::User, "b", "whatsapp"))
            .await
            .unwrap();
        log.insert(&ConversationRecord::new("u2", MessageRole::Assistant, "c", "whatsapp"))
            .await
            .unwrap();

        let stats = log
            .stats_since(Utc::now() - chrono::Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(stats.messages, 3);
        assert_eq!(stats.unique_users, 2);

        let stats = log
            .stats_since(Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stats.messages, 0);
    }

    #[tokio::test]
    async fn test_memory_log_recent_ordering() {
        let log = MemoryEventLog::new();
        log.insert(&ConversationRecord::new("u1", MessageRole::User, "first", "web"))
            .await
            .unwrap();
        log.insert(&ConversationRecord::new("u1", MessageRole::User, "second", "web"))
            .await
            .unwrap();

        let records = log.recent(1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "second");
    }
}
