//! Batched store commands.
//!
//! A [`Pipeline`] queues commands locally and is sent in one round trip by
//! [`KeyValueStore::execute`](super::KeyValueStore::execute). Commands are
//! applied in queue order. A pipeline is not a transaction: a failing command
//! does not undo the ones before it, so callers inspect every
//! [`CommandResult`].

use std::collections::HashMap;

/// Field map of one hash record.
pub type Record = HashMap<String, String>;

/// Outcome of one queued command: the reply, or the error message the store
/// reported for that command alone.
pub type CommandResult = Result<Reply, String>;

/// A single store command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    HGetAll { key: String },
    HSet { key: String, fields: Vec<(String, String)> },
    Del { key: String },
    Exists { key: String },
    ZAdd { key: String, member: String, score: f64 },
    ZRem { key: String, member: String },
    ZRange { key: String, start: isize, stop: isize },
    ZRevRange { key: String, start: isize, stop: isize },
    ZCard { key: String },
    Get { key: String },
    Set { key: String, value: String, ttl_seconds: Option<u64> },
    SetNx { key: String, value: String, ttl_seconds: Option<u64> },
    Incr { key: String, by: i64 },
    Expire { key: String, seconds: i64 },
    Ttl { key: String },
}

impl Command {
    /// Key the command operates on.
    pub fn key(&self) -> &str {
        match self {
            Command::HGetAll { key }
            | Command::HSet { key, .. }
            | Command::Del { key }
            | Command::Exists { key }
            | Command::ZAdd { key, .. }
            | Command::ZRem { key, .. }
            | Command::ZRange { key, .. }
            | Command::ZRevRange { key, .. }
            | Command::ZCard { key }
            | Command::Get { key }
            | Command::Set { key, .. }
            | Command::SetNx { key, .. }
            | Command::Incr { key, .. }
            | Command::Expire { key, .. }
            | Command::Ttl { key } => key,
        }
    }

    /// Redis command name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::HGetAll { .. } => "HGETALL",
            Command::HSet { .. } => "HSET",
            Command::Del { .. } => "DEL",
            Command::Exists { .. } => "EXISTS",
            Command::ZAdd { .. } => "ZADD",
            Command::ZRem { .. } => "ZREM",
            Command::ZRange { .. } => "ZRANGE",
            Command::ZRevRange { .. } => "ZREVRANGE",
            Command::ZCard { .. } => "ZCARD",
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::SetNx { .. } => "SETNX",
            Command::Incr { .. } => "INCRBY",
            Command::Expire { .. } => "EXPIRE",
            Command::Ttl { .. } => "TTL",
        }
    }
}

/// Typed reply of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Nil,
    Ok,
    Int(i64),
    Bool(bool),
    Text(String),
    Hash(Record),
    Members(Vec<String>),
}

impl Reply {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Reply::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Reply::Bool(b) => Some(*b),
            Reply::Int(n) => Some(*n != 0),
            _ => None,
        }
    }

    pub fn into_hash(self) -> Option<Record> {
        match self {
            Reply::Hash(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_members(self) -> Option<Vec<String>> {
        match self {
            Reply::Members(members) => Some(members),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Reply::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Queue of commands sent to the store in one round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    commands: Vec<Command>,
    atomic: bool,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the batch in MULTI/EXEC so no other client's command interleaves
    /// with it. Failed commands are still not rolled back.
    pub fn atomic(mut self) -> Self {
        self.atomic = true;
        self
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn hgetall(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::HGetAll { key: key.into() })
    }

    pub fn hset_multiple(&mut self, key: impl Into<String>, record: &Record) -> &mut Self {
        let mut fields: Vec<(String, String)> = record
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        fields.sort();
        self.push(Command::HSet {
            key: key.into(),
            fields,
        })
    }

    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::Del { key: key.into() })
    }

    pub fn exists(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::Exists { key: key.into() })
    }

    pub fn zadd(&mut self, key: impl Into<String>, member: impl Into<String>, score: f64) -> &mut Self {
        self.push(Command::ZAdd {
            key: key.into(),
            member: member.into(),
            score,
        })
    }

    pub fn zrem(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.push(Command::ZRem {
            key: key.into(),
            member: member.into(),
        })
    }

    pub fn zrange(&mut self, key: impl Into<String>, start: isize, stop: isize) -> &mut Self {
        self.push(Command::ZRange {
            key: key.into(),
            start,
            stop,
        })
    }

    pub fn zrevrange(&mut self, key: impl Into<String>, start: isize, stop: isize) -> &mut Self {
        self.push(Command::ZRevRange {
            key: key.into(),
            start,
            stop,
        })
    }

    pub fn zcard(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::ZCard { key: key.into() })
    }

    pub fn get(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::Get { key: key.into() })
    }

    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl_seconds: Option<u64>,
    ) -> &mut Self {
        self.push(Command::Set {
            key: key.into(),
            value: value.into(),
            ttl_seconds,
        })
    }

    pub fn set_nx(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl_seconds: Option<u64>,
    ) -> &mut Self {
        self.push(Command::SetNx {
            key: key.into(),
            value: value.into(),
            ttl_seconds,
        })
    }

    pub fn incr(&mut self, key: impl Into<String>, by: i64) -> &mut Self {
        self.push(Command::Incr { key: key.into(), by })
    }

    pub fn expire(&mut self, key: impl Into<String>, seconds: i64) -> &mut Self {
        self.push(Command::Expire {
            key: key.into(),
            seconds,
        })
    }

    pub fn ttl(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::Ttl { key: key.into() })
    }
}
