//! Ping command - Checks that the store answers.

use serde_json::json;

use super::{open_store, print_json};
use crate::config::Config;
use crate::errors::AppResult;

/// Execute the ping command
pub async fn execute(config: Config, memory: bool) -> AppResult<()> {
    let store = open_store(&config, memory).await?;
    store.ping().await?;
    tracing::debug!(prefix = %config.key_prefix, "Store reachable");

    print_json(&json!({ "status": "ok", "prefix": config.key_prefix }))
}
