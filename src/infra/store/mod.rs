//! Key-value store client.
//!
//! [`KeyValueStore`] is the uniform async surface the repositories are built
//! on: hash, sorted-set and string primitives plus batched execution.
//! [`RedisStore`] talks to Redis; [`MemoryStore`] keeps everything in process
//! and backs the tests.
//!
//! Transport failures are never swallowed here; they surface as
//! [`AppError::Store`](crate::errors::AppError::Store).

mod memory;
mod pipeline;
mod redis_store;

use async_trait::async_trait;

use crate::errors::AppResult;

pub use memory::MemoryStore;
pub use pipeline::{Command, CommandResult, Pipeline, Record, Reply};
pub use redis_store::RedisStore;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Primitive store operations.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Round-trip check
    async fn ping(&self) -> AppResult<()>;

    // Hashes

    /// All fields of a hash; empty when the key is absent
    async fn hgetall(&self, key: &str) -> AppResult<Record>;

    /// Set several hash fields at once
    async fn hset_multiple(&self, key: &str, record: &Record) -> AppResult<()>;

    /// Delete a key of any type, returning the number of keys removed
    async fn del(&self, key: &str) -> AppResult<u64>;

    /// Check key existence without reading it
    async fn exists(&self, key: &str) -> AppResult<bool>;

    // Sorted sets

    /// Add or re-score a member, returning 1 if it was new
    async fn zadd(&self, key: &str, member: &str, score: f64) -> AppResult<u64>;

    /// Remove a member, returning the number removed
    async fn zrem(&self, key: &str, member: &str) -> AppResult<u64>;

    /// Members by rank, ascending score; negative indexes count from the end
    async fn zrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>>;

    /// Members by rank, descending score
    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>>;

    /// Number of members
    async fn zcard(&self, key: &str) -> AppResult<u64>;

    // Strings

    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a string value, optionally expiring after `ttl_seconds`
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> AppResult<()>;

    /// Set only if the key does not exist; returns whether it was set
    async fn set_nx(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> AppResult<bool>;

    /// Replace the value only while it still equals `expected`; returns
    /// whether it was replaced
    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> AppResult<bool>;

    async fn incr(&self, key: &str, by: i64) -> AppResult<i64>;

    /// Set a key's time to live; returns false if the key does not exist
    async fn expire(&self, key: &str, seconds: i64) -> AppResult<bool>;

    /// Remaining time to live: -2 if the key is absent, -1 if it never expires
    async fn ttl(&self, key: &str) -> AppResult<i64>;

    // Batches

    /// Send every queued command in one round trip.
    ///
    /// Returns one result per command, in queue order; a command the server
    /// rejects fails only its own slot. Only a failure of the round trip
    /// itself, or a transaction the server refused to queue, is returned as
    /// `Err`.
    async fn execute(&self, pipeline: Pipeline) -> AppResult<Vec<CommandResult>>;
}
