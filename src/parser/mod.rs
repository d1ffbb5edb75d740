//! Incremental reconstruction of one assistant turn from the event stream.
//!
//! A `StreamParser` owns the parse state for exactly one in-flight response.
//! Events are applied synchronously in arrival order; after each one the
//! caller can take a [`Snapshot`] and re-render. The parser holds no
//! external resources, so an abandoned instance is simply dropped.

mod activity;

pub use activity::{ActivityKind, ActivityStatus, ContentPart, Snapshot, ToolActivity};

use chrono::Utc;

use crate::protocol::{DocumentItem, FileListing, SearchResult, StreamEvent};

/// Ordered response units; tool parts reference the activity log by index
/// so a later status change on a pending tool call shows up in every
/// snapshot taken afterwards.
#[derive(Debug)]
enum PartSlot {
    Text(String),
    Tool(usize),
}

#[derive(Debug, Default)]
struct ParseState {
    running_text: String,
    parts: Vec<PartSlot>,
    activities: Vec<ToolActivity>,
    documents: Vec<DocumentItem>,
    sources: Vec<SearchResult>,
    file_lists: Vec<FileListing>,
}

#[derive(Debug, Default)]
pub struct StreamParser {
    state: ParseState,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded event and return the updated snapshot.
    pub fn apply(&mut self, event: StreamEvent) -> Snapshot {
        match event {
            StreamEvent::Token(text) => self.apply_token(&text),
            StreamEvent::Sources(payload) => {
                let results = payload.into_vec();
                self.state.sources.extend(results.iter().cloned());
                self.push_tool_part(ActivityKind::Sources { results });
            }
            StreamEvent::Documents(payload) => {
                let documents = payload.into_vec();
                self.state.documents.extend(documents.iter().cloned());
                self.push_tool_part(ActivityKind::Documents { documents });
            }
            StreamEvent::ReadFile(result) => {
                self.push_tool_part(ActivityKind::ReadFile { result });
            }
            StreamEvent::ListFiles(listing) => {
                self.state.file_lists.push(listing.clone());
                self.push_tool_part(ActivityKind::ListFiles { listing });
            }
            StreamEvent::ChatHistory(turn) => {
                // Bookkeeping only: logged, never rendered as a part.
                self.state
                    .activities
                    .push(ToolActivity::new(ActivityKind::ChatHistory { turn }));
            }
            StreamEvent::Final(summary) => {
                // The summary is authoritative; it replaces whatever was
                // accumulated incrementally (which may double-count).
                self.state.documents = summary.documents;
                self.state.sources = summary.sources;
            }
        }
        self.current_state()
    }

    /// Record a named tool invocation whose result is not yet known.
    /// Returns the activity id for the matching [`complete_tool_call`].
    ///
    /// [`complete_tool_call`]: StreamParser::complete_tool_call
    pub fn begin_tool_call(&mut self, name: &str, params: serde_json::Value) -> String {
        let activity = ToolActivity::new(ActivityKind::ToolCall {
            name: name.to_string(),
            params,
            status: ActivityStatus::Pending,
            started_at: Utc::now(),
            ended_at: None,
        });
        let id = activity.id.clone();
        self.state.activities.push(activity);
        self.state
            .parts
            .push(PartSlot::Tool(self.state.activities.len() - 1));
        id
    }

    /// Mark a pending tool call as completed, freezing its elapsed time.
    /// Returns false if the id is unknown or the call already completed.
    pub fn complete_tool_call(&mut self, id: &str) -> bool {
        for activity in &mut self.state.activities {
            if activity.id != id {
                continue;
            }
            if let ActivityKind::ToolCall {
                status, ended_at, ..
            } = &mut activity.kind
            {
                if *status == ActivityStatus::Pending {
                    *status = ActivityStatus::Completed;
                    *ended_at = Some(Utc::now());
                    return true;
                }
            }
            return false;
        }
        false
    }

    /// True while any tool call is still pending (drives the caller's
    /// elapsed-time redraw tick).
    pub fn has_pending_activity(&self) -> bool {
        self.state.activities.iter().any(ToolActivity::is_pending)
    }

    /// Pure read of the current state. Idempotent: with no intervening
    /// event, two calls return structurally equal snapshots.
    pub fn current_state(&self) -> Snapshot {
        let state = &self.state;
        Snapshot {
            content: state.running_text.clone(),
            content_parts: state
                .parts
                .iter()
                .map(|slot| match slot {
                    PartSlot::Text(text) => ContentPart::Text { text: text.clone() },
                    PartSlot::Tool(idx) => ContentPart::Tool {
                        activity: state.activities[*idx].clone(),
                    },
                })
                .collect(),
            tool_activities: state.activities.clone(),
            documents: non_empty(&state.documents),
            sources: non_empty(&state.sources),
            file_lists: non_empty(&state.file_lists),
        }
    }

    /// Stable end-of-stream call site. Every event was applied on arrival,
    /// so nothing is left to flush; this is the same view `current_state`
    /// gives.
    pub fn finalize(&self) -> Snapshot {
        self.current_state()
    }

    /// Clear everything so one parser instance can serve the next turn.
    pub fn reset(&mut self) {
        self.state = ParseState::default();
    }

    fn apply_token(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.state.running_text.push_str(text);
        // Adjacent tokens never fragment: grow the trailing text part in
        // place, starting a fresh one only after a tool part.
        match self.state.parts.last_mut() {
            Some(PartSlot::Text(existing)) => existing.push_str(text),
            _ => self.state.parts.push(PartSlot::Text(text.to_string())),
        }
    }

    fn push_tool_part(&mut self, kind: ActivityKind) {
        self.state.activities.push(ToolActivity::new(kind));
        self.state
            .parts
            .push(PartSlot::Tool(self.state.activities.len() - 1));
    }
}

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items.to_vec())
    }
}

#[cfg(test)]
mod tests;
