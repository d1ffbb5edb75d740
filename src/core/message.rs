use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::Snapshot;
use crate::protocol::ChatRole;

/// One persisted chat message. Assistant messages carry the finalized
/// stream snapshot so the session view can replay tool activity later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new_user(session_id: String, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            role: ChatRole::User,
            content,
            snapshot: None,
            created_at: Utc::now(),
        }
    }

    pub fn new_assistant(session_id: String, snapshot: Snapshot) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            role: ChatRole::Assistant,
            content: snapshot.content.clone(),
            snapshot: Some(snapshot),
            created_at: Utc::now(),
        }
    }

    /// Assistant message recording a failed turn: the transport error text
    /// stands in for the answer and no snapshot is kept.
    pub fn new_assistant_error(session_id: String, error: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            role: ChatRole::Assistant,
            content: error,
            snapshot: None,
            created_at: Utc::now(),
        }
    }
}
