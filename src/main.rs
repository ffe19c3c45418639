//! Calendar Store - Application entry point
//!
//! CLI-based entry point that dispatches to the store commands.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use calendar_store::{
    cli::{Cli, Commands},
    commands,
    config::Config,
};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing (verbose mode sets debug level)
    init_tracing(cli.verbose);

    // Load configuration
    let config = Config::from_env();
    tracing::debug!(?config, "Configuration loaded");

    // Execute command
    let result = match cli.command {
        Commands::Ping => commands::ping::execute(config, cli.memory).await,
        Commands::Users(args) => commands::users::execute(args, config, cli.memory).await,
    };

    // Handle errors
    if let Err(e) = result {
        if e.is_client_error() {
            tracing::warn!(code = e.code(), "{}", e.user_message());
        } else {
            tracing::error!(code = e.code(), "Command failed: {}", e);
        }
        std::process::exit(1);
    }
}

/// Initialize tracing subscriber (logs go to stderr, JSON output to stdout)
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
