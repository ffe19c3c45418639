//! Commands module - CLI command implementations.
//!
//! Each command is implemented in its own module for separation of concerns.

pub mod ping;
pub mod users;

use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{KeyValueStore, MemoryStore, RedisStore};

/// Open the configured store
pub async fn open_store(config: &Config, memory: bool) -> AppResult<Arc<dyn KeyValueStore>> {
    if memory {
        tracing::warn!("Using in-process store; nothing will be persisted");
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(RedisStore::connect(config).await?))
}

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::internal(format!("Failed to encode output: {}", e)))?;
    println!("{}", output);
    Ok(())
}
