use clap::Parser as _;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::repl::format_history_line;
use super::{output, Cli, Commands};
use crate::client::EventStream;
use crate::core::message::StoredMessage;
use crate::parser::StreamParser;
use crate::protocol::StreamEvent;

#[test]
fn test_ask_parses_no_stream_flag() {
    let cli = Cli::try_parse_from(["ragline", "ask", "--no-stream", "what", "is", "this"]).unwrap();
    match cli.command {
        Some(Commands::Ask { query, no_stream }) => {
            assert!(no_stream);
            assert_eq!(query.join(" "), "what is this");
        }
        _ => panic!("expected ask subcommand"),
    }

    let cli = Cli::try_parse_from(["ragline", "ask", "hello"]).unwrap();
    match cli.command {
        Some(Commands::Ask { no_stream, .. }) => assert!(!no_stream),
        _ => panic!("expected ask subcommand"),
    }
}

#[test]
fn test_delete_rag_subcommand_parses() {
    let cli = Cli::try_parse_from(["ragline", "--rag", "handbook", "delete-rag"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::DeleteRag)));
    assert_eq!(cli.rag.as_deref(), Some("handbook"));
}

#[test]
fn test_history_lines_mirror_live_rendering() {
    let user = StoredMessage::new_user("s1".into(), "what is the leave policy?".into());
    assert_eq!(
        format_history_line(&user),
        "\x1b[32;1mrag>\x1b[0m what is the leave policy?"
    );

    let mut parser = StreamParser::new();
    parser.apply(StreamEvent::Token("Thirty days per year.".into()));
    let assistant = StoredMessage::new_assistant("s1".into(), parser.finalize());
    assert_eq!(format_history_line(&assistant), "Thirty days per year.");
}

#[tokio::test]
async fn test_render_stream_completes_pending_call_on_empty_stream() {
    let stream: EventStream = Box::pin(tokio_stream::empty());
    let mut parser = StreamParser::new();
    let pending = parser.begin_tool_call("agent", serde_json::json!({ "query": "hi" }));
    let cancel = CancellationToken::new();

    let snapshot = output::render_stream(
        stream,
        &mut parser,
        Duration::from_millis(10),
        &pending,
        &cancel,
    )
    .await
    .unwrap();

    assert!(!parser.has_pending_activity());
    let activity = snapshot
        .tool_activities
        .iter()
        .find(|a| a.id == pending)
        .expect("pending call survives into the snapshot");
    assert!(!activity.is_pending());
    assert!(activity.elapsed().is_some());
}

#[tokio::test]
async fn test_render_stream_completes_pending_call_on_first_event() {
    let stream: EventStream = Box::pin(tokio_stream::iter(vec![Ok(StreamEvent::Token(
        "answer".into(),
    ))]));
    let mut parser = StreamParser::new();
    let pending = parser.begin_tool_call("agent", serde_json::json!({ "query": "hi" }));
    let cancel = CancellationToken::new();

    let snapshot = output::render_stream(
        stream,
        &mut parser,
        Duration::from_millis(10),
        &pending,
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(snapshot.content, "answer");
    assert!(!parser.has_pending_activity());
}
