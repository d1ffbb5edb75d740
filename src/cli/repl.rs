use anyhow::Result;
use std::io::{self, Write};

use crate::client::Backend;
use crate::core::error::RaglineError;
use crate::core::message::StoredMessage;
use crate::core::session::Session;
use crate::parser::StreamParser;
use crate::protocol::ChatRole;

use super::output;
use super::App;

pub async fn run(app: App, resume_session: Option<String>) -> Result<()> {
    let rag = app.rag()?.to_string();

    println!("\x1b[1mragline\x1b[0m v{}", env!("CARGO_PKG_VERSION"));
    println!("Backend: \x1b[36m{}\x1b[0m  RAG: \x1b[36m{rag}\x1b[0m", app.config.base_url);
    println!("Type \x1b[33m/help\x1b[0m for commands, \x1b[33mCtrl-D\x1b[0m to exit.\n");

    let mut session = match resume_session {
        Some(id) => {
            let session = app.db.sessions().get(&id).await?;
            let history = app.db.messages().list(&session.id).await?;
            for msg in &history {
                println!("{}", format_history_line(msg));
            }
            if !history.is_empty() {
                println!();
            }
            session
        }
        None => {
            let s = Session::new("New session".into(), rag.clone());
            app.db.sessions().create(&s).await?;
            s
        }
    };

    // One parser serves the whole REPL; reset() readies it between turns.
    let mut parser = StreamParser::new();

    loop {
        eprint!("\x1b[32;1mrag>\x1b[0m ");
        io::stderr().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }

        let input = input.trim().to_string();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            match handle_command(&input, &app, &session).await {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    eprintln!("\x1b[31mCommand error: {e}\x1b[0m");
                    continue;
                }
            }
        }

        run_turn(&app, &mut session, &mut parser, &rag, input).await?;
    }

    Ok(())
}

/// One streamed question/answer exchange, persisted as two messages.
/// Client and storage failures are both fatal to the turn, so they come
/// back folded into [`RaglineError`].
async fn run_turn(
    app: &App,
    session: &mut Session,
    parser: &mut StreamParser,
    rag: &str,
    input: String,
) -> Result<(), RaglineError> {
    if session.message_count == 0 {
        session.title = truncate_title(&input);
    }

    let user_msg = StoredMessage::new_user(session.id.clone(), input.clone());
    app.db.messages().create(&user_msg).await?;

    let pending = parser.begin_tool_call("agent", serde_json::json!({ "query": input }));

    let cancel = tokio_util::sync::CancellationToken::new();
    let cancel_on_ctrlc = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_ctrlc.cancel();
        }
    });

    let outcome = match app.backend.stream_query(rag, &input).await {
        Ok(stream) => {
            output::render_stream(stream, parser, app.tick_interval(), &pending, &cancel).await
        }
        Err(e) => Err(e),
    };
    watcher.abort();

    let assistant_msg = match outcome {
        Ok(snapshot) => StoredMessage::new_assistant(session.id.clone(), snapshot),
        Err(e) => {
            eprintln!("\n\x1b[31mStream failed: {e}\x1b[0m");
            StoredMessage::new_assistant_error(session.id.clone(), format!("Error: {e}"))
        }
    };
    app.db.messages().create(&assistant_msg).await?;

    session.message_count += 2;
    app.db.sessions().update(session).await?;

    parser.reset();
    Ok(())
}

/// Render one stored message the way it looked live: user turns behind the
/// prompt, assistant turns as plain answer text.
pub(super) fn format_history_line(msg: &StoredMessage) -> String {
    match msg.role {
        ChatRole::User => format!("\x1b[32;1mrag>\x1b[0m {}", msg.content),
        ChatRole::Assistant => msg.content.clone(),
    }
}

fn truncate_title(input: &str) -> String {
    const MAX: usize = 60;
    if input.len() <= MAX {
        return input.to_string();
    }
    let boundary = (0..=MAX).rev().find(|&i| input.is_char_boundary(i)).unwrap_or(0);
    format!("{}…", &input[..boundary])
}

async fn handle_command(input: &str, app: &App, session: &Session) -> Result<bool> {
    let (cmd, arg) = match input.split_once(' ') {
        Some((c, a)) => (c, a.trim()),
        None => (input, ""),
    };

    match cmd {
        "/help" | "/h" => {
            println!("\x1b[1mCommands:\x1b[0m");
            println!("  /help              Show this help");
            println!("  /rags              List RAG indices on the backend");
            println!("  /files             List documents in the current RAG");
            println!("  /upload <glob>     Upload local files matching a pattern");
            println!("  /reindex           Rebuild the current RAG index");
            println!("  /sessions          List stored sessions");
            println!("  /clear             Clear current session messages");
            println!("  /exit              Exit");
            Ok(true)
        }
        "/exit" | "/quit" | "/q" => {
            println!("Goodbye!");
            Ok(false)
        }
        "/rags" => {
            for rag in app.backend.list_rags().await? {
                let marker = if rag == session.rag { " *" } else { "" };
                println!("  {rag}{marker}");
            }
            Ok(true)
        }
        "/files" => {
            let files = app.backend.list_files(&session.rag).await?;
            if files.is_empty() {
                println!("No documents.");
            }
            for file in files {
                println!("  {file}");
            }
            Ok(true)
        }
        "/upload" => {
            if arg.is_empty() {
                eprintln!("Usage: /upload <glob>");
            } else {
                super::run_upload(app, arg).await?;
            }
            Ok(true)
        }
        "/reindex" => {
            app.backend.create_rag(&session.rag).await?;
            println!("RAG \x1b[36m{}\x1b[0m reindexed.", session.rag);
            Ok(true)
        }
        "/sessions" | "/s" => {
            for s in app.db.sessions().list().await? {
                let marker = if s.id == session.id { " *" } else { "" };
                println!(
                    "  \x1b[90m{}\x1b[0m  {}{}  [{}] ({} msgs)",
                    &s.id[..8],
                    s.title,
                    marker,
                    s.rag,
                    s.message_count
                );
            }
            Ok(true)
        }
        "/clear" => {
            app.db.messages().delete_session_messages(&session.id).await?;
            println!("Session cleared.");
            Ok(true)
        }
        _ => {
            eprintln!("Unknown command: {input}. Type /help for available commands.");
            Ok(true)
        }
    }
}
