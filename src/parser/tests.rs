use super::*;
use crate::protocol::{
    ChatRole, ChatTurn, DocumentItem, FileListing, FinalSummary, OneOrMany, ReadFileResult,
    SearchResult, SearchResultUrl, StreamEvent,
};

fn token(text: &str) -> StreamEvent {
    StreamEvent::Token(text.into())
}

fn doc(content: &str, source: &str) -> DocumentItem {
    DocumentItem {
        content: content.into(),
        source: source.into(),
    }
}

fn search_result(title: &str, url: &str) -> SearchResult {
    SearchResult {
        content: String::new(),
        urls: vec![SearchResultUrl {
            title: title.into(),
            url: url.into(),
        }],
    }
}

#[test]
fn test_tokens_concatenate_into_single_part() {
    let mut parser = StreamParser::new();
    parser.apply(token("one "));
    parser.apply(token("two "));
    let snapshot = parser.apply(token("three"));

    assert_eq!(snapshot.content, "one two three");
    assert_eq!(snapshot.content_parts.len(), 1);
    match &snapshot.content_parts[0] {
        ContentPart::Text { text } => assert_eq!(text, "one two three"),
        other => panic!("expected text part, got {other:?}"),
    }
}

#[test]
fn test_tool_event_splits_parts() {
    let mut parser = StreamParser::new();
    parser.apply(token("before"));
    parser.apply(StreamEvent::Documents(OneOrMany::Many(vec![doc("d", "s")])));
    let snapshot = parser.apply(token("after"));

    assert_eq!(snapshot.content, "beforeafter");
    assert_eq!(snapshot.content_parts.len(), 3);
    assert!(matches!(
        &snapshot.content_parts[0],
        ContentPart::Text { text } if text == "before"
    ));
    assert!(matches!(&snapshot.content_parts[1], ContentPart::Tool { .. }));
    // Text after a tool part never merges backwards.
    assert!(matches!(
        &snapshot.content_parts[2],
        ContentPart::Text { text } if text == "after"
    ));
}

#[test]
fn test_documents_accumulate_one_or_many() {
    let mut parser = StreamParser::new();
    parser.apply(StreamEvent::Documents(OneOrMany::Many(vec![
        doc("a", "a.md"),
        doc("b", "b.md"),
    ])));
    let snapshot = parser.apply(StreamEvent::Documents(OneOrMany::One(doc("c", "c.md"))));

    let documents = snapshot.documents.expect("documents should accumulate");
    assert_eq!(documents.len(), 3);
    assert_eq!(documents[2].source, "c.md");
}

#[test]
fn test_final_overwrites_incremental_collections() {
    let mut parser = StreamParser::new();
    parser.apply(StreamEvent::Documents(OneOrMany::One(doc("d1", "1.md"))));
    parser.apply(StreamEvent::Documents(OneOrMany::One(doc("d2", "2.md"))));
    parser.apply(StreamEvent::Sources(OneOrMany::One(search_result(
        "t", "https://t",
    ))));

    let authoritative = vec![doc("d3", "3.md")];
    let snapshot = parser.apply(StreamEvent::Final(FinalSummary {
        documents: authoritative.clone(),
        sources: vec![],
        chat_history: vec![],
    }));

    assert_eq!(snapshot.documents, Some(authoritative));
    // Empty replacement clears the accumulated sources entirely.
    assert_eq!(snapshot.sources, None);
}

#[test]
fn test_read_file_adds_part_but_no_collection() {
    let mut parser = StreamParser::new();
    let snapshot = parser.apply(StreamEvent::ReadFile(ReadFileResult {
        file_path: "notes.txt".into(),
        success: true,
        content: Some("hello".into()),
        error: None,
    }));

    assert_eq!(snapshot.content_parts.len(), 1);
    assert_eq!(snapshot.tool_activities.len(), 1);
    assert_eq!(snapshot.documents, None);
    assert_eq!(snapshot.sources, None);
    assert_eq!(snapshot.file_lists, None);
}

#[test]
fn test_list_files_accumulates() {
    let listing = FileListing {
        directory_path: "docs".into(),
        success: true,
        files: vec!["a.md (file, 1.00 KB)".into()],
        error: None,
    };
    let mut parser = StreamParser::new();
    let snapshot = parser.apply(StreamEvent::ListFiles(listing.clone()));

    assert_eq!(snapshot.file_lists, Some(vec![listing]));
    assert_eq!(snapshot.content_parts.len(), 1);
}

#[test]
fn test_chat_history_is_bookkeeping_only() {
    let mut parser = StreamParser::new();
    let snapshot = parser.apply(StreamEvent::ChatHistory(ChatTurn {
        role: ChatRole::User,
        content: "earlier question".into(),
    }));

    assert!(snapshot.content_parts.is_empty());
    assert_eq!(snapshot.tool_activities.len(), 1);
}

#[test]
fn test_empty_token_is_noop() {
    let mut parser = StreamParser::new();
    parser.apply(token("text"));
    let before = parser.current_state();
    let after = parser.apply(token(""));
    assert_eq!(before, after);
}

#[test]
fn test_current_state_is_idempotent() {
    let mut parser = StreamParser::new();
    parser.apply(token("hello"));
    parser.apply(StreamEvent::Sources(OneOrMany::One(search_result(
        "a", "https://a",
    ))));

    assert_eq!(parser.current_state(), parser.current_state());
}

#[test]
fn test_finalize_matches_current_state() {
    let mut parser = StreamParser::new();
    parser.apply(token("done"));
    assert_eq!(parser.finalize(), parser.current_state());
}

#[test]
fn test_reset_restores_empty_shape() {
    let mut parser = StreamParser::new();
    parser.apply(token("text"));
    parser.apply(StreamEvent::Documents(OneOrMany::One(doc("d", "s"))));
    parser.reset();

    assert_eq!(parser.current_state(), StreamParser::new().current_state());
}

#[test]
fn test_tool_call_lifecycle() {
    let mut parser = StreamParser::new();
    let id = parser.begin_tool_call("agent", serde_json::json!({ "query": "q" }));
    assert!(parser.has_pending_activity());

    let snapshot = parser.current_state();
    let activity = &snapshot.tool_activities[0];
    assert!(activity.is_pending());
    assert!(activity.elapsed().expect("tool calls have elapsed time") >= chrono::Duration::zero());
    // The pending invocation is a displayable unit.
    assert_eq!(snapshot.content_parts.len(), 1);

    assert!(parser.complete_tool_call(&id));
    assert!(!parser.has_pending_activity());

    // Completing twice is rejected, and the elapsed value is frozen.
    assert!(!parser.complete_tool_call(&id));
    let frozen = parser.current_state().tool_activities[0].elapsed();
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert_eq!(parser.current_state().tool_activities[0].elapsed(), frozen);

    assert!(!parser.complete_tool_call("no-such-id"));
}

#[test]
fn test_completion_visible_through_existing_part() {
    let mut parser = StreamParser::new();
    let id = parser.begin_tool_call("agent", serde_json::Value::Null);
    parser.complete_tool_call(&id);

    match &parser.current_state().content_parts[0] {
        ContentPart::Tool { activity } => {
            assert!(matches!(
                activity.kind,
                ActivityKind::ToolCall {
                    status: ActivityStatus::Completed,
                    ..
                }
            ));
        }
        other => panic!("expected tool part, got {other:?}"),
    }
}

#[test]
fn test_empty_collections_omitted_from_serialized_snapshot() {
    let mut parser = StreamParser::new();
    parser.apply(token("just text"));

    let value = serde_json::to_value(parser.current_state()).unwrap();
    let obj = value.as_object().unwrap();
    assert!(!obj.contains_key("documents"));
    assert!(!obj.contains_key("sources"));
    assert!(!obj.contains_key("file_lists"));
}

#[test]
fn test_snapshot_survives_serialization() {
    let mut parser = StreamParser::new();
    parser.apply(token("hi"));
    parser.apply(StreamEvent::Sources(OneOrMany::One(search_result(
        "Example",
        "https://example.com",
    ))));
    let snapshot = parser.current_state();

    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, snapshot);
}

#[test]
fn test_full_turn_scenario() {
    let cited = search_result("Example", "https://example.com");

    let mut parser = StreamParser::new();
    parser.apply(token("Hello "));
    parser.apply(token("world"));
    parser.apply(StreamEvent::Sources(OneOrMany::One(cited.clone())));
    parser.apply(token("!"));
    let snapshot = parser.apply(StreamEvent::Final(FinalSummary {
        documents: vec![],
        sources: vec![cited.clone()],
        chat_history: vec![],
    }));

    assert_eq!(snapshot.content, "Hello world!");
    assert_eq!(snapshot.content_parts.len(), 3);
    assert!(matches!(
        &snapshot.content_parts[0],
        ContentPart::Text { text } if text == "Hello world"
    ));
    match &snapshot.content_parts[1] {
        ContentPart::Tool { activity } => {
            assert!(matches!(&activity.kind, ActivityKind::Sources { results } if results == &[cited.clone()]));
        }
        other => panic!("expected tool part, got {other:?}"),
    }
    assert!(matches!(
        &snapshot.content_parts[2],
        ContentPart::Text { text } if text == "!"
    ));
    assert_eq!(snapshot.sources, Some(vec![cited]));
    assert_eq!(snapshot.documents, None);
}
