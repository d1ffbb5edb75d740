use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::core::error::StorageError;
use crate::core::message::StoredMessage;
use crate::parser::Snapshot;
use crate::protocol::ChatRole;

pub struct MessageRepo {
    pool: SqlitePool,
}

impl MessageRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, msg: &StoredMessage) -> Result<(), StorageError> {
        let snapshot_json = msg
            .snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let role_str = match msg.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };

        sqlx::query(
            "INSERT INTO messages (id, session_id, role, content, snapshot_json, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&msg.id)
        .bind(&msg.session_id)
        .bind(role_str)
        .bind(&msg.content)
        .bind(&snapshot_json)
        .bind(msg.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn list(&self, session_id: &str) -> Result<Vec<StoredMessage>, StorageError> {
        let rows: Vec<(String, String, String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, session_id, role, content, snapshot_json, created_at \
             FROM messages WHERE session_id = ? ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_message).collect()
    }

    pub async fn delete_session_messages(&self, session_id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }
}

fn row_to_message(
    row: (String, String, String, String, Option<String>, String),
) -> Result<StoredMessage, StorageError> {
    let role = match row.2.as_str() {
        "user" => ChatRole::User,
        "assistant" => ChatRole::Assistant,
        other => {
            return Err(StorageError::Serialization(format!(
                "unknown message role: {other}"
            )))
        }
    };
    let snapshot: Option<Snapshot> = row
        .4
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    Ok(StoredMessage {
        id: row.0,
        session_id: row.1,
        role,
        content: row.3,
        snapshot,
        created_at: DateTime::parse_from_rfc3339(&row.5)
            .unwrap_or_default()
            .with_timezone(&Utc),
    })
}
