//! Terminal legal Q&A desk powered by juris-rs.
//!
//! Loads `template.json`, prints the desk title and the summary of every
//! index, then answers one question per line until end of input. Reads the
//! API key from the `OPENROUTER_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Interactive mode
//! juris-desk --template template.json --index-root "RAG Generator/"
//!
//! # One-shot mode
//! juris-desk --query "Is organ transplantation covered for ESI insured persons?"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use juris_desk::{DeskConfig, Template, build_session, desk_event_handler};
use juris_rs::agent::events::EventHandler;
use juris_rs::agent::session::Session;
use juris_rs::{OpenRouterClient, QueryError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Terminal legal Q&A desk powered by juris-rs.
#[derive(Parser)]
#[command(name = "juris-desk")]
struct Cli {
    /// Session template listing the indexes to load.
    #[arg(long, default_value = "template.json")]
    template: PathBuf,

    /// Directory holding one subdirectory per index.
    #[arg(long, default_value = juris_desk::config::DEFAULT_INDEX_ROOT)]
    index_root: PathBuf,

    /// Answer a single question and exit.
    #[arg(long)]
    query: Option<String>,

    /// Maximum agent iterations per question.
    #[arg(long, default_value_t = 10)]
    max_iterations: u32,

    /// Sub-questions answered concurrently.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Retries for transient provider failures.
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Passages retrieved per sub-question.
    #[arg(long, default_value_t = 3)]
    top_k: usize,

    /// Replacement worked example for question decomposition.
    #[arg(long)]
    example_file: Option<PathBuf>,

    /// Log pipeline activity to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "warn,juris_rs=debug,juris_desk=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let handler = desk_event_handler(cli.verbose);
    let mut session = match start(&cli) {
        Ok(s) => s,
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    };

    if let Some(query) = &cli.query {
        if !answer(&mut session, &handler, query).await {
            std::process::exit(1);
        }
        return;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("\nPlease enter your query - ");
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error: cannot read input: {e}");
                break;
            }
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        answer(&mut session, &handler, query).await;
    }
}

fn start(cli: &Cli) -> Result<Session, QueryError> {
    let template = Template::load(&cli.template)?;

    let api_key = std::env::var("OPENROUTER_KEY").map_err(|_| {
        QueryError::configuration("OPENROUTER_KEY environment variable is not set")
    })?;
    let client = Arc::new(OpenRouterClient::with_headers(
        api_key,
        "https://github.com/juris-rs/juris",
        "juris-desk",
    )?);

    let config = DeskConfig {
        index_root: cli.index_root.clone(),
        max_iterations: cli.max_iterations,
        concurrency: cli.concurrency,
        retries: cli.retries,
        top_k: cli.top_k,
        example_file: cli.example_file.clone(),
    };
    let session = build_session(&config, &template, client)?;

    println!("{}", template.title);
    println!("{}", "=".repeat(template.title.chars().count()));
    for (name, summary) in template.entries() {
        println!("\n{name}\n  {summary}");
    }
    Ok(session)
}

/// Print the answer or the failure line. Returns whether an answer was printed.
async fn answer(session: &mut Session, handler: &dyn EventHandler, query: &str) -> bool {
    match session.ask(query, handler).await {
        Ok(response) => {
            println!("\n{}", response.text);
            true
        }
        Err(e) => {
            report(&e);
            false
        }
    }
}

fn report(e: &QueryError) {
    eprintln!("Error [{}]: {e}", e.kind());
}
