use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::{ChatTurn, DocumentItem, FileListing, ReadFileResult, SearchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Pending,
    Completed,
}

/// What the agent did, one variant per displayable action. All variants are
/// immutable once recorded except `ToolCall`, which is created pending and
/// later marked completed (the result of the invocation is not known at
/// creation time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityKind {
    Sources {
        results: Vec<SearchResult>,
    },
    Documents {
        documents: Vec<DocumentItem>,
    },
    ReadFile {
        result: ReadFileResult,
    },
    ListFiles {
        listing: FileListing,
    },
    ChatHistory {
        turn: ChatTurn,
    },
    ToolCall {
        name: String,
        params: serde_json::Value,
        status: ActivityStatus,
        started_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ended_at: Option<DateTime<Utc>>,
    },
}

/// One record of agent action, shown in chronological order alongside the
/// streamed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolActivity {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ActivityKind,
}

impl ToolActivity {
    pub fn new(kind: ActivityKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self.kind,
            ActivityKind::ToolCall {
                status: ActivityStatus::Pending,
                ..
            }
        )
    }

    /// Wall-clock time a tool call has been (or was) running: running calls
    /// measure against now, completed calls freeze at `ended_at`. `None` for
    /// activity kinds without a lifecycle.
    pub fn elapsed(&self) -> Option<Duration> {
        match &self.kind {
            ActivityKind::ToolCall {
                started_at,
                ended_at,
                ..
            } => Some(ended_at.unwrap_or_else(Utc::now) - *started_at),
            _ => None,
        }
    }
}

/// One chronologically ordered unit of the assembled response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Tool { activity: ToolActivity },
}

/// Immutable view of the response being assembled. Optional collections are
/// omitted while empty. Safe to take after every event; consumers never see
/// parser internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub content: String,
    pub content_parts: Vec<ContentPart>,
    pub tool_activities: Vec<ToolActivity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<DocumentItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SearchResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_lists: Option<Vec<FileListing>>,
}
