//! # pdf-brief CLI
//!
//! The `pdf-brief` binary starts the HTTP server and exposes the same
//! operations locally.
//!
//! ## Usage
//!
//! ```bash
//! pdf-brief --config ./config/pdf-brief.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdf-brief init` | Create the storage directory and database schema |
//! | `pdf-brief serve` | Start the HTTP API |
//! | `pdf-brief list` | List stored PDFs |
//! | `pdf-brief upload <path>` | Store a local PDF |
//! | `pdf-brief delete <id>` | Delete a stored PDF |
//! | `pdf-brief summarize <id>` | Print the summary of a PDF |
//! | `pdf-brief ask <id> "<question>"` | Answer a question about a PDF |
//!
//! Logs go to stderr and are filtered with `RUST_LOG`
//! (default `pdf_brief=info,tower_http=info`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_brief::app::App;
use pdf_brief::config::{self, Config};
use pdf_brief::{db, migrate, server};

/// pdf-brief: store PDFs and ask a local LLM about them.
#[derive(Parser)]
#[command(
    name = "pdf-brief",
    about = "pdf-brief: store PDFs and summarize or query them with a local LLM",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Built-in defaults are used when the file does not exist.
    #[arg(long, global = true, default_value = "./config/pdf-brief.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storage directory and database schema.
    ///
    /// Idempotent; the server also does this on startup.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// List stored PDFs in upload order.
    List,

    /// Store a local PDF file and print its id.
    Upload {
        /// Path to the PDF.
        path: PathBuf,
    },

    /// Delete a stored PDF by id.
    Delete { id: i64 },

    /// Print the summary of a stored PDF (cached after the first run).
    Summarize { id: i64 },

    /// Answer a question about a stored PDF.
    Ask {
        id: i64,
        /// The question, quoted.
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_brief=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            init(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::List => {
            let app = App::open(&cfg).await?;
            let pdfs = app.list().await?;
            if pdfs.is_empty() {
                println!("No PDFs stored.");
            }
            for pdf in &pdfs {
                println!("{:>4}  {}  ({})", pdf.id, pdf.filename, pdf.filepath);
            }
            app.close().await;
        }
        Commands::Upload { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("not a file path: {}", path.display()))?
                .to_string();

            let app = App::open(&cfg).await?;
            let record = app.upload(bytes, &filename).await?;
            println!("Uploaded {} as id {}", record.filename, record.id);
            app.close().await;
        }
        Commands::Delete { id } => {
            let app = App::open(&cfg).await?;
            let record = app.delete(id).await?;
            println!("Deleted {} (id {})", record.filename, record.id);
            app.close().await;
        }
        Commands::Summarize { id } => {
            let app = App::open(&cfg).await?;
            let summary = app.summarize(id).await?;
            println!("{}", summary);
            app.close().await;
        }
        Commands::Ask { id, question } => {
            let app = App::open(&cfg).await?;
            let answer = app.answer(id, &question).await?;
            println!("{}", answer);
            app.close().await;
        }
    }

    Ok(())
}

async fn init(cfg: &Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cfg.storage.root).with_context(|| {
        format!(
            "cannot create storage root {}",
            cfg.storage.root.display()
        )
    })?;
    let pool = db::connect(cfg).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    Ok(())
}
