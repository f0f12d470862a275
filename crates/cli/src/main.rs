//! Conclave CLI — the main entry point.
//!
//! Commands:
//! - `ask`          — Route a query and run the collaborating specialists
//! - `route`        — Show the routing decision for a query
//! - `capabilities` — List the configured capabilities
//! - `knowledge`    — Add to or search the knowledge base
//! - `onboard`      — Write a default config and knowledge layout
//! - `status`       — Show the effective configuration

use std::path::PathBuf;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "conclave",
    about = "Conclave — route a query to collaborating specialist agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ~/.conclave/config.toml)
    #[arg(long, global = true, env = "CONCLAVE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a query with the specialist agents
    Ask {
        /// The question to answer
        query: String,

        /// Print the session transcript as JSON
        #[arg(long)]
        json: bool,

        /// Overall time budget for the request
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Show how a query would be routed, without answering it
    Route {
        /// The question to route
        query: String,
    },

    /// List configured capabilities
    Capabilities,

    /// Manage the knowledge base
    Knowledge {
        #[command(subcommand)]
        action: KnowledgeAction,
    },

    /// Initialize configuration and knowledge directories
    Onboard,

    /// Show system status
    Status,
}

#[derive(Subcommand)]
enum KnowledgeAction {
    /// Add a markdown document to a collection
    Add {
        collection: String,
        title: String,
        /// File whose contents become the document body
        file: PathBuf,
    },

    /// Search what a capability would see for a query
    Search {
        capability: String,
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Ask {
            query,
            json,
            timeout_secs,
        } => commands::ask::run(config, &query, json, timeout_secs).await?,
        Commands::Route { query } => commands::route::run(config, &query).await?,
        Commands::Capabilities => commands::capabilities::run(config)?,
        Commands::Knowledge { action } => match action {
            KnowledgeAction::Add {
                collection,
                title,
                file,
            } => commands::knowledge::add(config, &collection, &title, &file)?,
            KnowledgeAction::Search {
                capability,
                query,
                limit,
            } => commands::knowledge::search(config, &capability, &query, limit).await?,
        },
        Commands::Onboard => commands::onboard::run(config)?,
        Commands::Status => commands::status::run(config)?,
    }

    Ok(())
}
