mod output;
mod repl;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use crate::client::{Backend, HttpBackend};
use crate::core::config::AppConfig;
use crate::core::error::ClientError;
use crate::parser::StreamParser;
use crate::protocol::Framing;
use crate::storage::Database;

#[derive(Parser)]
#[command(name = "ragline", version, about = "Chat with a streaming RAG agent backend")]
struct Cli {
    /// RAG index to target (falls back to default_rag from config)
    #[arg(long, global = true)]
    rag: Option<String>,

    /// Backend base URL
    #[arg(long, global = true, env = "RAGLINE_BASE_URL")]
    base_url: Option<String>,

    /// Treat the stream as legacy plain text instead of JSON records
    #[arg(long, global = true)]
    raw_text: bool,

    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session (default)
    Chat {
        /// Resume an existing session by id
        #[arg(long)]
        resume: Option<String>,
    },
    /// One-shot question, streamed to stdout
    Ask {
        query: Vec<String>,
        /// Wait for the complete answer instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },
    /// List available RAG indices
    Rags,
    /// (Re)build the index for the selected RAG from its documents
    Reindex,
    /// Delete the selected RAG index and its uploaded documents
    DeleteRag,
    /// List documents uploaded to the selected RAG
    Files,
    /// Upload local files matching a glob pattern
    Upload { pattern: String },
    /// Delete one uploaded document
    DeleteFile { filename: String },
    /// List stored chat sessions
    Sessions,
}

pub struct App {
    pub config: AppConfig,
    pub backend: Arc<dyn Backend>,
    pub db: Database,
    rag: Option<String>,
}

impl App {
    pub fn rag(&self) -> Result<&str, ClientError> {
        self.rag.as_deref().ok_or(ClientError::NoRagSelected)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms)
    }
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "ragline=debug" } else { "ragline=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    if cli.debug {
        config.debug = true;
    }

    let rag = cli.rag.or_else(|| config.default_rag.clone());

    let mut backend = HttpBackend::new(config.base_url.clone());
    if cli.raw_text {
        backend = backend.with_framing(Framing::RawText);
    }

    let db = Database::open(&config).await?;
    db.run_migrations().await?;

    let app = App {
        config,
        backend: Arc::new(backend),
        db,
        rag,
    };

    match cli.command.unwrap_or(Commands::Chat { resume: None }) {
        Commands::Chat { resume } => repl::run(app, resume).await,
        Commands::Ask { query, no_stream } => run_ask(&app, query.join(" "), no_stream).await,
        Commands::Rags => {
            for rag in app.backend.list_rags().await? {
                println!("{rag}");
            }
            Ok(())
        }
        Commands::Reindex => {
            let rag = app.rag()?;
            app.backend.create_rag(rag).await?;
            println!("RAG \x1b[36m{rag}\x1b[0m reindexed.");
            Ok(())
        }
        Commands::Files => {
            let rag = app.rag()?;
            for file in app.backend.list_files(rag).await? {
                println!("{file}");
            }
            Ok(())
        }
        Commands::DeleteRag => {
            let rag = app.rag()?;
            app.backend.delete_rag(rag).await?;
            println!("RAG \x1b[36m{rag}\x1b[0m deleted.");
            Ok(())
        }
        Commands::Upload { pattern } => run_upload(&app, &pattern).await,
        Commands::DeleteFile { filename } => {
            let rag = app.rag()?;
            app.backend.delete_file(rag, &filename).await?;
            println!("Deleted {filename}.");
            Ok(())
        }
        Commands::Sessions => {
            let sessions = app.db.sessions().list().await?;
            if sessions.is_empty() {
                println!("No sessions.");
            }
            for s in sessions {
                println!(
                    "  \x1b[90m{}\x1b[0m  {}  [{}] ({} msgs)",
                    &s.id[..8],
                    s.title,
                    s.rag,
                    s.message_count
                );
            }
            Ok(())
        }
    }
}

async fn run_ask(app: &App, query: String, no_stream: bool) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("empty query");
    }
    let rag = app.rag()?;

    if no_stream {
        let answer = app.backend.query(rag, &query).await?;
        println!("{answer}");
        return Ok(());
    }

    let mut parser = StreamParser::new();
    let pending = parser.begin_tool_call("agent", serde_json::json!({ "query": query }));

    let cancel = tokio_util::sync::CancellationToken::new();
    let stream = app.backend.stream_query(rag, &query).await?;
    output::render_stream(stream, &mut parser, app.tick_interval(), &pending, &cancel).await?;
    Ok(())
}

async fn run_upload(app: &App, pattern: &str) -> Result<()> {
    let rag = app.rag()?;

    let mut uploaded = 0usize;
    for entry in glob::glob(pattern)? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("unusable file name: {}", path.display()))?;
        let bytes = std::fs::read(&path)?;
        app.backend.upload_file(rag, &filename, bytes).await?;
        println!("  \x1b[32m✓\x1b[0m {filename}");
        uploaded += 1;
    }

    if uploaded == 0 {
        println!("No files matched {pattern}.");
    } else {
        println!("Uploaded {uploaded} file(s). Run \x1b[33mragline reindex\x1b[0m to rebuild the index.");
    }
    Ok(())
}
