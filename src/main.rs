use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcp_fault_diagnosis::{
    config::{Config, LogFormat},
    server::{load_content, AppState, McpServer},
};

#[derive(Parser)]
#[command(name = "mcp-fault-diagnosis")]
#[command(about = "Fault diagnosis engine served over MCP", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdin/stdout (default)
    Serve,

    /// Load and validate the decision tree and knowledge corpus, then exit
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Validate => validate(&config),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "MCP fault diagnosis server starting"
    );

    let state = match AppState::from_config(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "Failed to initialize application state");
            return Err(e.into());
        }
    };

    let server = McpServer::new(state);
    info!("Server ready, waiting for requests on stdin");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

fn validate(config: &Config) -> anyhow::Result<()> {
    let (catalog, corpus) = load_content(config)?;

    println!(
        "catalog: {} nodes ({} leaves), root '{}'",
        catalog.len(),
        catalog.leaf_count(),
        catalog.root_id()
    );
    println!(
        "corpus: {} documents, {} keyword categories",
        corpus.documents().len(),
        corpus.taxonomy().categories().len()
    );
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
