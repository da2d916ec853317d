//! # Bank assistant CLI (`bankbot`)
//!
//! ## Usage
//!
//! ```bash
//! bankbot --config ./config/bankbot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bankbot generate-data` | Ask the model for a synthetic customer CSV |
//! | `bankbot generate-policy` | Ask the model for policy clauses (AGB) |
//! | `bankbot index` | Rebuild the knowledge index from the knowledge directory |
//! | `bankbot search "<query>"` | Inspect the knowledge index |
//! | `bankbot chat` | Start the interactive assistant |
//!
//! Diagnostics go to stderr through `tracing` (filter with `RUST_LOG`);
//! stdout carries command output and the conversation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bank_rag::config;
use bank_rag::generate::{customers, policy};
use bank_rag::{indexer, llm, search, session};

/// Retrieval-augmented assistant prototype for a cooperative bank.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/bankbot.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "bankbot",
    about = "Retrieval-augmented assistant prototype for a cooperative bank",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bankbot.toml")]
    config: PathBuf,

    /// Log at debug level unless `RUST_LOG` is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic customer CSV.
    ///
    /// Sends one sampled request to the configured model and writes the
    /// reply to `[paths].customers_csv`.
    GenerateData {
        /// Number of customer rows to request (default: `[generator].rows`).
        #[arg(long)]
        rows: Option<usize>,
    },

    /// Generate policy clauses into the knowledge directory.
    GeneratePolicy,

    /// Rebuild the knowledge index.
    ///
    /// Reads every matching text file in `[paths].knowledge_dir`, chunks
    /// and embeds it, and replaces the index at `[paths].knowledge_store`.
    Index,

    /// Search the knowledge index.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results (default: `[retrieval].knowledge_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start the interactive assistant.
    ///
    /// Loads the customer CSV, builds the customer index, opens the
    /// knowledge index and runs the login/question loop on the console.
    Chat,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::GenerateData { rows } => {
            let model = llm::create_model(&cfg.llm)?;
            customers::run_generate_data(&cfg, rows, model.as_ref()).await?;
        }
        Commands::GeneratePolicy => {
            let model = llm::create_model(&cfg.llm)?;
            policy::run_generate_policy(&cfg, model.as_ref()).await?;
        }
        Commands::Index => {
            indexer::run_index(&cfg).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Chat => {
            session::run_chat(&cfg).await?;
        }
    }

    Ok(())
}
