//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

/// Calendar Store - Redis-backed users, categories and todos
#[derive(Parser, Debug)]
#[command(name = "calendar-store")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use an in-process store instead of Redis (data is lost on exit)
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the store is reachable
    Ping,

    /// Manage users
    Users(UsersArgs),
}

/// Arguments for the users command
#[derive(Parser, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub action: UsersAction,
}

/// User actions
#[derive(Subcommand, Debug)]
pub enum UsersAction {
    /// Register a new user
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Already-hashed password
        #[arg(long)]
        password_hash: String,
    },
    /// Show a user by ID
    Get { id: String },
    /// Look a user up by email
    Find {
        #[arg(long)]
        email: String,
    },
    /// List users, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Page size (defaults to DEFAULT_PAGE_SIZE)
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Delete a user by ID
    Delete { id: String },
}
