//! CLI module - Command-line interface for the application.
//!
//! Provides commands for:
//! - `ping` - Store connectivity check
//! - `users` - Create, inspect, list and delete users

pub mod args;

pub use args::{Cli, Commands};
