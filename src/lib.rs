//! Calendar Store - Redis-backed persistence for a calendar/to-do application
//!
//! Entities live in Redis hashes, are listed through a sorted set scored by
//! creation time and can be looked up through secondary index keys. One
//! generic repository engine carries that layout; each entity only maps its
//! fields and maintains its own indexes.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core entities, creation inputs and partial updates
//! - **services**: Application use cases (registration, lookups)
//! - **infra**: Key layout, store clients and repositories
//! - **types**: Shared types (pagination)
//! - **utils**: ID generation and field serialization
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Check the connection
//! cargo run -- ping
//!
//! # Register and look up a user
//! cargo run -- users create --email ada@example.com --name Ada --password-hash '$argon2id$...'
//! cargo run -- users find --email ADA@example.com
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use config::Config;
pub use domain::{Category, Todo, User};
pub use errors::{AppError, AppResult};
pub use infra::{KeySpace, KeyValueStore, MemoryStore, RedisRepository, RedisStore};
pub use types::{Page, PageRequest};
