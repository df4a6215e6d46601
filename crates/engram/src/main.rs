// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engram - a durable long-term memory engine for conversational agents.
//!
//! This is the binary entry point: it loads configuration, wires the
//! OpenAI-compatible providers and the SQLite fact store into an engine,
//! and exposes ingestion, retrieval, consolidation, and counters as
//! subcommands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use engram_config::EngramConfig;
use engram_core::EngramError;
use engram_memory::{FactStore, MemoryEngine, RawMessage};

/// Engram - a durable long-term memory engine for conversational agents.
#[derive(Parser, Debug)]
#[command(name = "engram", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a JSON file of dialog messages.
    Add {
        /// File containing a JSON array of {role, content, timeStamp} objects.
        file: PathBuf,
        /// Run extraction immediately instead of waiting for the buffer trigger.
        #[arg(long)]
        force: bool,
    },
    /// Query the store and print matching memories.
    Retrieve {
        query: String,
        /// Maximum number of results.
        #[arg(short, long, default_value_t = 5)]
        k: usize,
    },
    /// Run offline consolidation (phase 1 then phase 2).
    Consolidate {
        #[arg(long, default_value_t = engram_memory::consolidator::DEFAULT_TOP_K)]
        top_k: usize,
        #[arg(long, default_value_t = engram_memory::consolidator::DEFAULT_KEEP_TOP_N)]
        keep_top_n: usize,
        #[arg(long, default_value_t = engram_memory::consolidator::DEFAULT_SCORE_THRESHOLD)]
        score_threshold: f32,
    },
    /// Print accumulated token counters.
    Stats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), EngramError> {
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.agent.log_level);

    let engine = build_engine(config).await?;

    match cli.command {
        Commands::Add { file, force } => {
            let raw = std::fs::read_to_string(&file).map_err(|e| {
                EngramError::Config(format!("cannot read {}: {e}", file.display()))
            })?;
            let messages: Vec<RawMessage> = serde_json::from_str(&raw).map_err(|e| {
                EngramError::InvalidMessage(format!("{} is not a message array: {e}", file.display()))
            })?;

            let count = messages.len();
            let report = engine.add_memory(messages, force).await?;
            info!(messages = count, facts = report.facts_created, "ingestion complete");
            if report.extracted {
                println!("{count} messages ingested, {} facts created", report.facts_created);
            } else {
                println!("{count} messages buffered (extraction trigger not reached)");
            }
        }
        Commands::Retrieve { query, k } => {
            let result = engine.retrieve(&query, k, None).await?;
            if result.is_empty() {
                println!("(no matching memories)");
            } else {
                println!("{result}");
            }
        }
        Commands::Consolidate {
            top_k,
            keep_top_n,
            score_threshold,
        } => {
            let queued = engine
                .construct_update_queue_all_entries(top_k, keep_top_n)
                .await?;
            println!("phase 1: queues built for {queued} records");

            let report = engine.offline_update_all_entries(score_threshold).await?;
            println!(
                "phase 2: {} targets visited, {} updated, {} deleted, {} ignored, {} failed",
                report.targets_visited,
                report.updated,
                report.deleted,
                report.ignored,
                report.failures
            );
        }
        Commands::Stats => {
            let stats = engine.token_statistics();
            let json = serde_json::to_string_pretty(&stats)
                .map_err(|e| EngramError::Internal(e.to_string()))?;
            println!("{json}");
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngramConfig, EngramError> {
    let config = match path {
        Some(path) => engram_config::load_config_from_path(path),
        None => engram_config::load_config(),
    }
    .map_err(|e| EngramError::Config(e.to_string()))?;

    if let Err(errors) = engram_config::validate_config(&config) {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(EngramError::Config(joined));
    }
    Ok(config)
}

async fn build_engine(config: EngramConfig) -> Result<MemoryEngine, EngramError> {
    let provider = Arc::new(engram_openai::chat_client_from_config(&config.llm)?);
    let embedder = Arc::new(engram_openai::embeddings_client_from_config(
        &config.embedder,
        config.llm.api_key.as_deref(),
    )?);
    let store = Arc::new(
        FactStore::open(
            &config.storage.database_path,
            config.embedder.dimensions,
            config.storage.wal_mode,
        )
        .await?,
    );
    Ok(MemoryEngine::new(config, provider, embedder, store))
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("engram={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
