use std::io::{self, Write};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::EventStream;
use crate::core::error::ClientError;
use crate::parser::{Snapshot, StreamParser, ToolActivity};
use crate::protocol::StreamEvent;

/// Drive one streamed turn to completion: apply every event to the parser,
/// print tokens and tool activity as they arrive, and keep the pending
/// tool-call timer redrawing on a fixed tick until the first event lands.
///
/// A transport error is fatal to the turn and returned as-is; the caller
/// substitutes an error message and discards the parse state. Cancellation
/// just abandons the read loop: whatever was assembled so far is returned.
pub async fn render_stream(
    stream: EventStream,
    parser: &mut StreamParser,
    tick_interval: Duration,
    pending_id: &str,
    cancel: &CancellationToken,
) -> Result<Snapshot, ClientError> {
    let mut stream = stream;
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                clear_status_line();
                eprintln!("\n\x1b[33m[interrupted]\x1b[0m");
                break;
            }
            item = stream.next() => {
                match item {
                    None => break,
                    Some(Err(e)) => {
                        clear_status_line();
                        return Err(e);
                    }
                    Some(Ok(event)) => {
                        if parser.has_pending_activity() {
                            parser.complete_tool_call(pending_id);
                            clear_status_line();
                        }
                        render_event(&event);
                        parser.apply(event);
                    }
                }
            }
            _ = ticker.tick(), if parser.has_pending_activity() => {
                draw_pending(&parser.current_state().tool_activities);
            }
        }
    }

    // The stream may end (or be cancelled) before any event arrives; the
    // pending call must not outlive the turn it belongs to.
    if parser.has_pending_activity() {
        parser.complete_tool_call(pending_id);
        clear_status_line();
    }

    let snapshot = parser.finalize();
    println!();
    if let Some(sources) = &snapshot.sources {
        for result in sources {
            for url in &result.urls {
                eprintln!("\x1b[90m  ↳ {} ({})\x1b[0m", url.title, url.url);
            }
        }
    }
    Ok(snapshot)
}

fn render_event(event: &StreamEvent) {
    match event {
        StreamEvent::Token(text) => {
            print!("{text}");
            io::stdout().flush().ok();
        }
        StreamEvent::Sources(_) => {
            eprintln!("\n\x1b[36;1m[web search]\x1b[0m");
        }
        StreamEvent::Documents(payload) => {
            let count = payload.clone().into_vec().len();
            eprintln!("\n\x1b[36;1m[documents]\x1b[0m {count} chunk(s) retrieved");
        }
        StreamEvent::ReadFile(result) => {
            if result.success {
                eprintln!("\n\x1b[36;1m[read_file]\x1b[0m {}", result.file_path);
            } else {
                eprintln!(
                    "\n\x1b[31;1m[read_file]\x1b[0m {}: {}",
                    result.file_path,
                    result.error.as_deref().unwrap_or("failed")
                );
            }
        }
        StreamEvent::ListFiles(listing) => {
            if listing.success {
                eprintln!(
                    "\n\x1b[36;1m[list_files]\x1b[0m {} ({} entries)",
                    listing.directory_path,
                    listing.files.len()
                );
            } else {
                eprintln!(
                    "\n\x1b[31;1m[list_files]\x1b[0m {}: {}",
                    listing.directory_path,
                    listing.error.as_deref().unwrap_or("failed")
                );
            }
        }
        // Bookkeeping and the terminal summary draw nothing themselves.
        StreamEvent::ChatHistory(_) | StreamEvent::Final(_) => {}
    }
}

/// Redraw the elapsed time of the first pending tool call in place.
fn draw_pending(activities: &[ToolActivity]) {
    let Some(activity) = activities.iter().find(|a| a.is_pending()) else {
        return;
    };
    if let Some(elapsed) = activity.elapsed() {
        let secs = elapsed.num_milliseconds() as f64 / 1000.0;
        eprint!("\r\x1b[90m⋯ waiting for agent ({secs:.1}s)\x1b[0m");
        io::stderr().flush().ok();
    }
}

fn clear_status_line() {
    eprint!("\r\x1b[K");
    io::stderr().flush().ok();
}
