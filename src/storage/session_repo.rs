use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::core::error::StorageError;
use crate::core::session::Session;

pub struct SessionRepo {
    pool: SqlitePool,
}

impl SessionRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, session: &Session) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO sessions (id, title, rag, message_count, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.title)
        .bind(&session.rag)
        .bind(session.message_count as i64)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Session, StorageError> {
        let row: (String, String, String, i64, String, String) = sqlx::query_as(
            "SELECT id, title, rag, message_count, created_at, updated_at \
             FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?
        .ok_or_else(|| StorageError::NotFound(format!("session {id}")))?;

        Ok(row_to_session(row))
    }

    pub async fn list(&self) -> Result<Vec<Session>, StorageError> {
        let rows: Vec<(String, String, String, i64, String, String)> = sqlx::query_as(
            "SELECT id, title, rag, message_count, created_at, updated_at \
             FROM sessions ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(row_to_session).collect())
    }

    pub async fn update(&self, session: &Session) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE sessions SET title = ?, message_count = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&session.title)
        .bind(session.message_count as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(&session.id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }
}

fn row_to_session(row: (String, String, String, i64, String, String)) -> Session {
    Session {
        id: row.0,
        title: row.1,
        rag: row.2,
        message_count: row.3 as u64,
        created_at: DateTime::parse_from_rfc3339(&row.4)
            .unwrap_or_default()
            .with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&row.5)
            .unwrap_or_default()
            .with_timezone(&Utc),
    }
}
