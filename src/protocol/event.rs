use serde::{Deserialize, Serialize};
use tracing::warn;

/// One URL citation from a web search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultUrl {
    pub title: String,
    pub url: String,
}

/// A web search result: answer text plus its citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub urls: Vec<SearchResultUrl>,
}

/// A document retrieved from the RAG index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentItem {
    pub content: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadFileResult {
    pub file_path: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileListing {
    pub directory_path: String,
    pub success: bool,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One past conversation turn replayed by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Authoritative end-of-turn summary. Its `documents` and `sources`
/// replace whatever accumulated incrementally during the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSummary {
    #[serde(default)]
    pub documents: Vec<DocumentItem>,
    #[serde(default)]
    pub sources: Vec<SearchResult>,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

/// The backend emits `documents`/`sources` payloads either as a single
/// object or as an array; both decode to the same thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// One decoded protocol record. Wire format is `{"type": .., "data": ..}`,
/// newline-delimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Token(String),
    Sources(OneOrMany<SearchResult>),
    Documents(OneOrMany<DocumentItem>),
    ReadFile(ReadFileResult),
    ListFiles(FileListing),
    ChatHistory(ChatTurn),
    Final(FinalSummary),
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decode one complete record line. Unknown event types are ignored with a
/// warning so newer backends keep working; a malformed line is an error the
/// caller drops without aborting the stream.
pub fn decode_record(line: &str) -> Result<Option<StreamEvent>, serde_json::Error> {
    let raw: RawRecord = serde_json::from_str(line)?;
    let event = match raw.kind.as_str() {
        "token" => StreamEvent::Token(serde_json::from_value(raw.data)?),
        "sources" => StreamEvent::Sources(serde_json::from_value(raw.data)?),
        "documents" => StreamEvent::Documents(serde_json::from_value(raw.data)?),
        "read_file" => StreamEvent::ReadFile(serde_json::from_value(raw.data)?),
        "list_files" => StreamEvent::ListFiles(serde_json::from_value(raw.data)?),
        "chat_history" => StreamEvent::ChatHistory(serde_json::from_value(raw.data)?),
        "final" => StreamEvent::Final(serde_json::from_value(raw.data)?),
        other => {
            warn!(kind = other, "ignoring unknown stream event type");
            return Ok(None);
        }
    };
    Ok(Some(event))
}
