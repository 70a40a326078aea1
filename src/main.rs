//! # InsureRAG CLI (`irag`)
//!
//! Talks to an insurance-document RAG backend: check that it is up, upload
//! policy documents, ask questions and read the cited excerpts.
//!
//! ## Usage
//!
//! ```bash
//! irag --config ./config/irag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `irag health` | Check backend health |
//! | `irag status` | Print the backend status payload |
//! | `irag documents` | List documents the backend has indexed |
//! | `irag upload <path>` | Validate and upload a PDF or TXT document |
//! | `irag ask "<question>"` | Ask one question and print answer and sources |
//! | `irag chat` | Interactive session |
//!
//! The backend URL comes from `INSURE_RAG_API_URL`, then `[api].base_url`,
//! then `http://localhost:8000`.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

use insure_rag::api::{ApiClient, RagBackend};
use insure_rag::config::{self, Config};
use insure_rag::models::View;
use insure_rag::notify::{NoNotices, NoticeSink};
use insure_rag::progress::{ReportMode, UploadProgressReporter};
use insure_rag::render;
use insure_rag::session::Session;
use insure_rag::sources::{RelevanceFilter, SortBy, SourceView};

/// InsureRAG: ask questions about your insurance documents.
#[derive(Parser)]
#[command(
    name = "irag",
    about = "InsureRAG: ask questions about your insurance documents",
    version,
    long_about = "Client for an InsureRAG backend. Upload policy documents (PDF or TXT), \
    ask natural-language questions about them, and inspect the document excerpts each \
    answer was based on."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/irag.toml`. A missing file means built-in
    /// defaults.
    #[arg(long, global = true, default_value = "./config/irag.toml")]
    config: PathBuf,

    /// Machine-readable output: JSON on stdout, JSON-lines notices and
    /// progress on stderr.
    #[arg(long, global = true)]
    json: bool,

    /// Suppress notices and progress on stderr.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable and healthy.
    Health,

    /// Print the backend's status payload.
    Status,

    /// List documents the backend has indexed.
    Documents,

    /// Upload a document for indexing.
    ///
    /// The file is checked locally first: PDF or TXT, not empty, at most
    /// the configured size limit (50 MB by default).
    Upload {
        /// Path to a `.pdf` or `.txt` file.
        path: PathBuf,
    },

    /// Ask a single question about the uploaded documents.
    ///
    /// Prints the answer followed by the cited sources, deduplicated and
    /// grouped by document.
    Ask {
        question: String,

        /// Order within each document: `relevance`, `document` or `chunk`.
        #[arg(long, default_value = "relevance")]
        sort: SortBy,

        /// Relevance band to show: `all`, `high`, `medium` or `low`.
        #[arg(long, default_value = "all")]
        filter: RelevanceFilter,
    },

    /// Start an interactive session.
    ///
    /// Lines are questions; lines starting with `:` are commands
    /// (`:help` lists them).
    Chat,
}

/// Output settings shared by all commands.
struct Output {
    json: bool,
    notices: Box<dyn NoticeSink>,
    progress: Box<dyn UploadProgressReporter>,
}

impl Output {
    fn new(json: bool, quiet: bool) -> Self {
        let (notice_mode, progress_mode) = if quiet {
            (ReportMode::Off, ReportMode::Off)
        } else if json {
            (ReportMode::Json, ReportMode::Json)
        } else {
            (ReportMode::Human, ReportMode::default_for_tty())
        };
        Self {
            json,
            notices: notice_mode.notices(),
            progress: progress_mode.reporter(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let client = ApiClient::new(&cfg)?;
    let out = Output::new(cli.json, cli.quiet);

    log::debug!("using backend {}", client.base_url());

    match cli.command {
        Commands::Health => run_health(&client, &out).await?,
        Commands::Status => {
            let status = client
                .get_status()
                .await
                .context("Status request failed")?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Documents => {
            let docs = client
                .list_documents()
                .await
                .context("Failed to list documents")?;
            if out.json {
                println!("{}", serde_json::to_string_pretty(&docs)?);
            } else {
                print!("{}", render::documents_table(&docs));
            }
        }
        Commands::Upload { path } => run_upload(&cfg, &client, &path, &out).await?,
        Commands::Ask {
            question,
            sort,
            filter,
        } => run_ask(&cfg, &client, &question, sort, filter, &out).await?,
        Commands::Chat => run_chat(&cfg, &client, &out).await?,
    }

    Ok(())
}

async fn run_health(client: &ApiClient, out: &Output) -> anyhow::Result<()> {
    let health = client
        .check_health()
        .await
        .with_context(|| format!("Backend at {} is not healthy", client.base_url()))?;
    if out.json {
        println!("{}", serde_json::to_string_pretty(&health)?);
    } else {
        println!("Backend at {} is healthy.", client.base_url());
        if let Some(status) = health.get("status").and_then(|s| s.as_str()) {
            println!("  status: {}", status);
        }
    }
    Ok(())
}

async fn run_upload(
    cfg: &Config,
    client: &ApiClient,
    path: &Path,
    out: &Output,
) -> anyhow::Result<()> {
    let mut session = Session::new(cfg);
    let doc = session
        .upload(client, path, out.progress.as_ref(), out.notices.as_ref())
        .await
        .with_context(|| format!("Upload of {} failed", path.display()))?;

    if out.json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("Uploaded {}", render::document_line(&doc));
    }
    Ok(())
}

async fn run_ask(
    cfg: &Config,
    client: &ApiClient,
    question: &str,
    sort: SortBy,
    filter: RelevanceFilter,
    out: &Output,
) -> anyhow::Result<()> {
    let mut session = Session::new(cfg);
    session.bootstrap(client, &NoNotices).await;
    if !session.is_api_healthy() {
        bail!(
            "Unable to connect to the backend API at {}",
            client.base_url()
        );
    }

    let exchange = session
        .ask(client, question, out.notices.as_ref())
        .await?
        .clone();
    let view = SourceView::build(&exchange.sources, sort, filter);

    if out.json {
        let body = serde_json::json!({
            "exchange": exchange,
            "sources": view,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", exchange.response);
        if !view.is_empty() || view.received > 0 {
            println!();
            print!("{}", render::source_view(&view));
        }
    }
    Ok(())
}

const CHAT_HELP: &str = "\
Type a question and press enter. Commands:
  :upload <path>                      upload a PDF or TXT document
  :docs                               list known documents
  :history                            show the transcript
  :sources [sort] [filter]            show sources of the last answer
                                      sort: relevance|document|chunk
                                      filter: all|high|medium|low
  :view [upload|chat|sources]         show or switch the active view
  :help                               this text
  :quit                               leave";

async fn run_chat(cfg: &Config, client: &ApiClient, out: &Output) -> anyhow::Result<()> {
    let mut session = Session::new(cfg);
    session.bootstrap(client, out.notices.as_ref()).await;

    println!("InsureRAG chat against {}. Type :help for commands.", client.base_url());
    print!("{}", render::views(&session));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix(':') {
            let mut parts = command.split_whitespace();
            let name = parts.next().unwrap_or("");
            let args: Vec<&str> = parts.collect();
            match name {
                "quit" | "q" | "exit" => break,
                "help" | "h" => println!("{}", CHAT_HELP),
                "docs" => print!("{}", render::documents_table(session.documents())),
                "history" => print!("{}", render::transcript(session.transcript())),
                "upload" => {
                    if args.is_empty() {
                        println!("usage: :upload <path>");
                        continue;
                    }
                    let path = PathBuf::from(args.join(" "));
                    // Failures are already reported as notices.
                    if let Ok(doc) = session
                        .upload(client, &path, out.progress.as_ref(), out.notices.as_ref())
                        .await
                    {
                        println!("Uploaded {}", render::document_line(&doc));
                    }
                }
                "sources" => match parse_source_args(&args) {
                    Ok((sort, filter)) => {
                        if let Err(e) = session.select_view(View::Sources) {
                            println!("{}", e);
                            continue;
                        }
                        let view = SourceView::build(session.current_sources(), sort, filter);
                        print!("{}", render::source_view(&view));
                    }
                    Err(e) => println!("{}", e),
                },
                "view" => match args.first() {
                    None => print!("{}", render::views(&session)),
                    Some(arg) => match arg.parse::<View>() {
                        Ok(view) => match session.select_view(view) {
                            Ok(()) => println!("switched to {}", view),
                            Err(e) => println!("{}", e),
                        },
                        Err(e) => println!("{}", e),
                    },
                },
                other => println!("unknown command ':{}' (try :help)", other),
            }
            continue;
        }

        match session.ask(client, line, out.notices.as_ref()).await {
            Ok(exchange) => {
                println!("{}", exchange.response);
                let n = exchange.sources.len();
                if n > 0 {
                    println!(
                        "({} source{}; :sources to inspect)",
                        n,
                        if n == 1 { "" } else { "s" }
                    );
                }
            }
            Err(e) => match session.transcript().last() {
                Some(last) if last.query == line => println!("{}", last.response),
                _ => println!("{}", e),
            },
        }
    }

    Ok(())
}

/// `[sort] [filter]` in either order; omitted parts take their defaults.
fn parse_source_args(args: &[&str]) -> Result<(SortBy, RelevanceFilter), String> {
    let mut sort = SortBy::default();
    let mut filter = RelevanceFilter::default();
    for arg in args {
        if let Ok(s) = arg.parse::<SortBy>() {
            sort = s;
        } else if let Ok(f) = arg.parse::<RelevanceFilter>() {
            filter = f;
        } else {
            return Err(format!(
                "unknown option '{}': expected relevance|document|chunk or all|high|medium|low",
                arg
            ));
        }
    }
    Ok((sort, filter))
}
