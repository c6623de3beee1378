use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use oracle_kb::{cli, config, server};

#[derive(Parser)]
#[command(name = "oracle", version, about = "Hybrid keyword + semantic search over a knowledge base")]
struct Cli {
    /// Config file (defaults to ~/.oracle/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Start the HTTP server (JSON API and MCP over Streamable HTTP)
    Http,
    /// Search the knowledge base
    Search {
        query: String,
        /// principle, pattern, learning, retro, or all
        #[arg(long = "type")]
        doc_type: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        /// hybrid, fts, or vector
        #[arg(long)]
        mode: Option<String>,
    },
    /// Find documents similar to a document
    Similar {
        id: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Show document counts and vector collection status
    Stats,
    /// Import documents from a JSON file
    Import { file: PathBuf },
    /// Push every stored document to the vector collection
    Reindex {
        /// Drop and recreate the collection first
        #[arg(long)]
        fresh: bool,
    },
    /// Check the database and the vector subprocess
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::OracleConfig::load_from(path)?,
        None => config::OracleConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve_stdio(config).await?,
        Command::Http => server::serve_http(config).await?,
        Command::Search {
            query,
            doc_type,
            limit,
            mode,
        } => cli::search(&config, &query, doc_type.as_deref(), limit, mode.as_deref()).await?,
        Command::Similar { id, limit } => cli::similar(&config, &id, limit).await?,
        Command::Stats => cli::stats(&config).await?,
        Command::Import { file } => cli::import(&config, &file)?,
        Command::Reindex { fresh } => cli::reindex(&config, fresh).await?,
        Command::Doctor => cli::doctor(&config).await?,
    }

    Ok(())
}
