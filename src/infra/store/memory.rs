//! In-process implementation of the key-value store.
//!
//! Mirrors the Redis semantics the repositories rely on: empty hashes and
//! sorted sets disappear, expired keys read as absent, and a command against
//! a key of another type fails with `WRONGTYPE` without affecting the rest of
//! its pipeline. A whole pipeline is applied under one lock.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{ErrorKind, RedisError};
use tokio::sync::Mutex;

use super::{Command, CommandResult, KeyValueStore, Pipeline, Record, Reply};
use crate::errors::{AppError, AppResult};

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_AN_INTEGER: &str = "ERR value is not an integer or out of range";

#[derive(Debug, Clone)]
enum Value {
    Hash(Record),
    SortedSet(HashMap<String, f64>),
    Text(String),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
}

/// In-memory store; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Keyspace>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub async fn dbsize(&self) -> usize {
        let mut keyspace = self.inner.lock().await;
        keyspace.purge_expired(Instant::now());
        keyspace.entries.len()
    }

    /// Live keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keyspace = self.inner.lock().await;
        keyspace.purge_expired(Instant::now());
        let mut keys: Vec<String> = keyspace.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn run(&self, command: Command) -> AppResult<Reply> {
        let mut keyspace = self.inner.lock().await;
        keyspace.apply(command, Instant::now()).map_err(command_error)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> AppResult<Record> {
        let reply = self.run(Command::HGetAll { key: key.to_string() }).await?;
        Ok(reply.into_hash().unwrap_or_default())
    }

    async fn hset_multiple(&self, key: &str, record: &Record) -> AppResult<()> {
        if record.is_empty() {
            return Ok(());
        }
        let fields = record
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        self.run(Command::HSet {
            key: key.to_string(),
            fields,
        })
        .await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> AppResult<u64> {
        let reply = self.run(Command::Del { key: key.to_string() }).await?;
        Ok(reply.as_int().unwrap_or(0) as u64)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let reply = self.run(Command::Exists { key: key.to_string() }).await?;
        Ok(reply.as_bool().unwrap_or(false))
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> AppResult<u64> {
        let reply = self
            .run(Command::ZAdd {
                key: key.to_string(),
                member: member.to_string(),
                score,
            })
            .await?;
        Ok(reply.as_int().unwrap_or(0) as u64)
    }

    async fn zrem(&self, key: &str, member: &str) -> AppResult<u64> {
        let reply = self
            .run(Command::ZRem {
                key: key.to_string(),
                member: member.to_string(),
            })
            .await?;
        Ok(reply.as_int().unwrap_or(0) as u64)
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>> {
        let reply = self
            .run(Command::ZRange {
                key: key.to_string(),
                start,
                stop,
            })
            .await?;
        Ok(reply.into_members().unwrap_or_default())
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>> {
        let reply = self
            .run(Command::ZRevRange {
                key: key.to_string(),
                start,
                stop,
            })
            .await?;
        Ok(reply.into_members().unwrap_or_default())
    }

    async fn zcard(&self, key: &str) -> AppResult<u64> {
        let reply = self.run(Command::ZCard { key: key.to_string() }).await?;
        Ok(reply.as_int().unwrap_or(0) as u64)
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let reply = self.run(Command::Get { key: key.to_string() }).await?;
        Ok(reply.into_text())
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> AppResult<()> {
        self.run(Command::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl_seconds,
        })
        .await?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> AppResult<bool> {
        let reply = self
            .run(Command::SetNx {
                key: key.to_string(),
                value: value.to_string(),
                ttl_seconds,
            })
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> AppResult<bool> {
        let mut keyspace = self.inner.lock().await;
        let now = Instant::now();
        let current = keyspace
            .apply(Command::Get { key: key.to_string() }, now)
            .map_err(command_error)?;
        if current.into_text().as_deref() != Some(expected) {
            return Ok(false);
        }
        keyspace
            .apply(
                Command::Set {
                    key: key.to_string(),
                    value: value.to_string(),
                    ttl_seconds,
                },
                now,
            )
            .map_err(command_error)?;
        Ok(true)
    }

    async fn incr(&self, key: &str, by: i64) -> AppResult<i64> {
        let reply = self
            .run(Command::Incr {
                key: key.to_string(),
                by,
            })
            .await?;
        Ok(reply.as_int().unwrap_or(0))
    }

    async fn expire(&self, key: &str, seconds: i64) -> AppResult<bool> {
        let reply = self
            .run(Command::Expire {
                key: key.to_string(),
                seconds,
            })
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }

    async fn ttl(&self, key: &str) -> AppResult<i64> {
        let reply = self.run(Command::Ttl { key: key.to_string() }).await?;
        Ok(reply.as_int().unwrap_or(-2))
    }

    async fn execute(&self, pipeline: Pipeline) -> AppResult<Vec<CommandResult>> {
        let mut keyspace = self.inner.lock().await;
        let now = Instant::now();
        Ok(pipeline
            .into_commands()
            .into_iter()
            .map(|command| keyspace.apply(command, now))
            .collect())
    }
}

impl Keyspace {
    fn purge_expired(&mut self, now: Instant) {
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    /// Live entry at `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut Entry> {
        if self.entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn apply(&mut self, command: Command, now: Instant) -> CommandResult {
        match command {
            Command::HGetAll { key } => match self.live(&key, now) {
                None => Ok(Reply::Hash(Record::new())),
                Some(Entry {
                    value: Value::Hash(record),
                    ..
                }) => Ok(Reply::Hash(record.clone())),
                Some(_) => Err(WRONGTYPE.to_string()),
            },
            Command::HSet { key, fields } => {
                if fields.is_empty() {
                    return Err("ERR wrong number of arguments for 'hset' command".to_string());
                }
                let entry = self
                    .live(&key, now)
                    .is_none()
                    .then(|| Entry::new(Value::Hash(Record::new())));
                if let Some(entry) = entry {
                    self.entries.insert(key.clone(), entry);
                }
                match self.entries.get_mut(&key).map(|entry| &mut entry.value) {
                    Some(Value::Hash(record)) => {
                        let added = fields
                            .into_iter()
                            .filter(|(field, value)| {
                                record.insert(field.clone(), value.clone()).is_none()
                            })
                            .count();
                        Ok(Reply::Int(added as i64))
                    }
                    _ => Err(WRONGTYPE.to_string()),
                }
            }
            Command::Del { key } => {
                let removed = self.live(&key, now).is_some();
                self.entries.remove(&key);
                Ok(Reply::Int(removed as i64))
            }
            Command::Exists { key } => Ok(Reply::Bool(self.live(&key, now).is_some())),
            Command::ZAdd { key, member, score } => {
                let entry = self
                    .live(&key, now)
                    .is_none()
                    .then(|| Entry::new(Value::SortedSet(HashMap::new())));
                if let Some(entry) = entry {
                    self.entries.insert(key.clone(), entry);
                }
                match self.entries.get_mut(&key).map(|entry| &mut entry.value) {
                    Some(Value::SortedSet(members)) => {
                        let added = members.insert(member, score).is_none();
                        Ok(Reply::Int(added as i64))
                    }
                    _ => Err(WRONGTYPE.to_string()),
                }
            }
            Command::ZRem { key, member } => {
                let (removed, now_empty) = match self.live(&key, now) {
                    None => return Ok(Reply::Int(0)),
                    Some(Entry {
                        value: Value::SortedSet(members),
                        ..
                    }) => (members.remove(&member).is_some(), members.is_empty()),
                    Some(_) => return Err(WRONGTYPE.to_string()),
                };
                if now_empty {
                    self.entries.remove(&key);
                }
                Ok(Reply::Int(removed as i64))
            }
            Command::ZRange { key, start, stop } => {
                let ordered = self.sorted_members(&key, now)?;
                Ok(Reply::Members(slice_by_rank(ordered, start, stop)))
            }
            Command::ZRevRange { key, start, stop } => {
                let mut ordered = self.sorted_members(&key, now)?;
                ordered.reverse();
                Ok(Reply::Members(slice_by_rank(ordered, start, stop)))
            }
            Command::ZCard { key } => match self.live(&key, now) {
                None => Ok(Reply::Int(0)),
                Some(Entry {
                    value: Value::SortedSet(members),
                    ..
                }) => Ok(Reply::Int(members.len() as i64)),
                Some(_) => Err(WRONGTYPE.to_string()),
            },
            Command::Get { key } => match self.live(&key, now) {
                None => Ok(Reply::Nil),
                Some(Entry {
                    value: Value::Text(text),
                    ..
                }) => Ok(Reply::Text(text.clone())),
                Some(_) => Err(WRONGTYPE.to_string()),
            },
            Command::Set {
                key,
                value,
                ttl_seconds,
            } => {
                let mut entry = Entry::new(Value::Text(value));
                entry.expires_at = ttl_seconds.map(|ttl| now + Duration::from_secs(ttl));
                self.entries.insert(key, entry);
                Ok(Reply::Ok)
            }
            Command::SetNx {
                key,
                value,
                ttl_seconds,
            } => {
                if self.live(&key, now).is_some() {
                    return Ok(Reply::Bool(false));
                }
                let mut entry = Entry::new(Value::Text(value));
                entry.expires_at = ttl_seconds.map(|ttl| now + Duration::from_secs(ttl));
                self.entries.insert(key, entry);
                Ok(Reply::Bool(true))
            }
            Command::Incr { key, by } => match self.live(&key, now) {
                None => {
                    self.entries.insert(key, Entry::new(Value::Text(by.to_string())));
                    Ok(Reply::Int(by))
                }
                Some(Entry {
                    value: Value::Text(text),
                    ..
                }) => {
                    let next = text
                        .parse::<i64>()
                        .ok()
                        .and_then(|current| current.checked_add(by))
                        .ok_or_else(|| NOT_AN_INTEGER.to_string())?;
                    *text = next.to_string();
                    Ok(Reply::Int(next))
                }
                Some(_) => Err(WRONGTYPE.to_string()),
            },
            Command::Expire { key, seconds } => {
                if self.live(&key, now).is_none() {
                    return Ok(Reply::Bool(false));
                }
                if seconds <= 0 {
                    self.entries.remove(&key);
                } else if let Some(entry) = self.entries.get_mut(&key) {
                    entry.expires_at = Some(now + Duration::from_secs(seconds as u64));
                }
                Ok(Reply::Bool(true))
            }
            Command::Ttl { key } => match self.live(&key, now) {
                None => Ok(Reply::Int(-2)),
                Some(Entry {
                    expires_at: None, ..
                }) => Ok(Reply::Int(-1)),
                Some(Entry {
                    expires_at: Some(deadline),
                    ..
                }) => {
                    let remaining = deadline.saturating_duration_since(now).as_millis() as i64;
                    Ok(Reply::Int((remaining + 500) / 1000))
                }
            },
        }
    }

    /// Members ordered by score, ties broken by member.
    fn sorted_members(&mut self, key: &str, now: Instant) -> Result<Vec<String>, String> {
        match self.live(key, now) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::SortedSet(members),
                ..
            }) => {
                let mut ordered: Vec<(&String, &f64)> = members.iter().collect();
                ordered.sort_by(|a, b| {
                    a.1.partial_cmp(b.1)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.0.cmp(b.0))
                });
                Ok(ordered.into_iter().map(|(member, _)| member.clone()).collect())
            }
            Some(_) => Err(WRONGTYPE.to_string()),
        }
    }
}

/// Inclusive rank slice with Redis index rules: negative indexes count from
/// the end, out-of-range bounds are clamped, an inverted range is empty.
fn slice_by_rank(members: Vec<String>, start: isize, stop: isize) -> Vec<String> {
    let len = members.len() as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len {
        return Vec::new();
    }

    members
        .into_iter()
        .skip(start as usize)
        .take((stop - start + 1) as usize)
        .collect()
}

fn command_error(message: String) -> AppError {
    AppError::Store(RedisError::from((
        ErrorKind::ResponseError,
        "Command failed",
        message,
    )))
}
