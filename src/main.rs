//! # ragserve CLI (`rag`)
//!
//! The `rag` binary drives the retrieval-grounded prompting service. It
//! answers one-off questions, lists the known sources, preloads the content
//! caches, and starts the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag ask "<prompt>"` | Answer a prompt from documents/tables, with model fallback |
//! | `rag sources` | List known documents and database tables |
//! | `rag warm` | Preload the document and table content caches |
//! | `rag serve http` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Ask with automatic source discovery
//! rag ask "What is the rollback procedure?"
//!
//! # Pin the context to specific sources, skipping relevance ranking
//! rag ask "Summarize Q3" --doc q3-review.pptx --table revenue
//!
//! # Start the HTTP API
//! rag serve http --config ./config/rag.toml
//! ```

mod answer;
mod cache;
mod config;
mod db;
mod documents;
mod extract;
mod fuzzy;
mod generate;
mod keywords;
mod logging;
mod models;
mod normalize;
mod orchestrate;
mod rank;
mod server;
mod tables;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::PromptRequest;

/// ragserve — a retrieval-grounded prompting service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "ragserve — a retrieval-grounded prompting service with answer caching",
    version,
    long_about = "ragserve answers free-text questions by ranking ingested documents and \
    database tables for relevance, extracting direct answers from their content when it can, \
    and falling back to a generative model with grounded context when it cannot. Repeated and \
    paraphrased questions are served from a normalized-key response cache."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Answer a prompt.
    ///
    /// Checks the response cache, discovers relevant documents and tables
    /// (or uses the explicitly referenced ones), attempts a direct answer
    /// from document content, and falls back to the generative model.
    Ask {
        /// The question to answer.
        prompt: String,

        /// Document filename to use verbatim (repeatable). Skips ranking.
        #[arg(long = "doc")]
        docs: Vec<String>,

        /// Table name to use verbatim (repeatable). Skips ranking.
        #[arg(long = "table")]
        tables: Vec<String>,

        /// Sampling temperature for the generative model.
        #[arg(long)]
        temperature: Option<f64>,

        /// Abandon the request after this many milliseconds.
        #[arg(long)]
        budget_ms: Option<u64>,
    },

    /// List known documents and database tables.
    Sources,

    /// Preload the document and table content caches.
    ///
    /// Extracts every known document and retrieves every known table so the
    /// first queries do not pay extraction latency. Per-source failures are
    /// logged and skipped.
    Warm,

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the HTTP API server on the configured bind address.
    Http,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let pool = db::connect(&cfg).await?;
    let documents = Arc::new(documents::DocumentStore::new(&cfg)?);
    let tables = Arc::new(tables::TableStore::new(pool, &cfg));
    let generator = Arc::new(generate::OllamaGenerator::new(&cfg.generation)?);
    let orchestrator = Arc::new(orchestrate::Orchestrator::new(
        &cfg,
        Arc::clone(&documents),
        Arc::clone(&tables),
        generator,
    ));

    match cli.command {
        Commands::Ask {
            prompt,
            docs,
            tables: table_refs,
            temperature,
            budget_ms,
        } => {
            let request = PromptRequest {
                prompt,
                document_refs: docs,
                table_refs,
                temperature,
                budget_ms,
            };
            let response = orchestrator.answer(&request).await;

            println!("{}", response.answer);
            if !response.document_sources.is_empty() || !response.table_sources.is_empty() {
                println!();
                println!("sources:");
                for doc in &response.document_sources {
                    match doc.page_count {
                        Some(pages) => {
                            println!("  document: {} ({}, {} pages)", doc.filename, doc.doc_type, pages)
                        }
                        None => println!("  document: {} ({})", doc.filename, doc.doc_type),
                    }
                }
                for table in &response.table_sources {
                    println!("  table: {}", table.table_name);
                }
            }
        }
        Commands::Sources => {
            let doc_names = documents.list_documents()?;
            println!("documents ({}):", doc_names.len());
            for name in &doc_names {
                println!("  {}", name);
            }

            let table_names = tables.list_tables().await?;
            println!("tables ({}):", table_names.len());
            for name in &table_names {
                println!("  {}", name);
            }
        }
        Commands::Warm => {
            let (doc_count, table_count) = orchestrator.warm().await;
            println!("preloaded {} documents, {} tables", doc_count, table_count);
        }
        Commands::Serve { service } => match service {
            ServeService::Http => {
                server::run_server(&cfg, orchestrator, documents, tables).await?;
            }
        },
    }

    Ok(())
}
