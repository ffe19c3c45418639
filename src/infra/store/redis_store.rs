//! Redis implementation of the key-value store.
//!
//! Uses a [`ConnectionManager`], which multiplexes one connection across all
//! clones and reconnects on failure. Clone the store freely.

use async_trait::async_trait;
use redis::{
    aio::{ConnectionLike, ConnectionManager},
    AsyncCommands, Client, FromRedisValue, RedisError, RedisResult, Value,
};

use super::{Command, CommandResult, KeyValueStore, Pipeline, Record, Reply};
use crate::config::Config;
use crate::errors::{AppError, AppResult};

/// Sets `KEYS[1]` to `ARGV[2]` only while it holds `ARGV[1]`, expiring
/// after `ARGV[3]` seconds when given.
const COMPARE_AND_SET: &str = r"
if redis.call('GET', KEYS[1]) ~= ARGV[1] then
    return 0
end
if ARGV[3] then
    redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
else
    redis.call('SET', KEYS[1], ARGV[2])
end
return 1
";

/// Redis-backed store.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis using the configured URL.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let store = Self::try_connect(&config.redis_url).await.map_err(store_error)?;
        tracing::info!("Redis store connected");
        Ok(store)
    }

    /// Connect to the given URL, returning the raw Redis error on failure.
    pub async fn try_connect(url: &str) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> AppResult<Record> {
        let mut conn = self.connection.clone();
        let record: Record = conn.hgetall(key).await.map_err(store_error)?;
        Ok(record)
    }

    async fn hset_multiple(&self, key: &str, record: &Record) -> AppResult<()> {
        if record.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let fields: Vec<(&String, &String)> = record.iter().collect();
        let _: () = conn.hset_multiple(key, fields.as_slice()).await.map_err(store_error)?;
        Ok(())
    }

    async fn del(&self, key: &str) -> AppResult<u64> {
        let mut conn = self.connection.clone();
        let removed: u64 = conn.del(key).await.map_err(store_error)?;
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(key).await.map_err(store_error)?;
        Ok(exists)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> AppResult<u64> {
        let mut conn = self.connection.clone();
        let added: u64 = conn.zadd(key, member, score).await.map_err(store_error)?;
        Ok(added)
    }

    async fn zrem(&self, key: &str, member: &str) -> AppResult<u64> {
        let mut conn = self.connection.clone();
        let removed: u64 = conn.zrem(key, member).await.map_err(store_error)?;
        Ok(removed)
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let members: Vec<String> = conn.zrange(key, start, stop).await.map_err(store_error)?;
        Ok(members)
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let members: Vec<String> = conn.zrevrange(key, start, stop).await.map_err(store_error)?;
        Ok(members)
    }

    async fn zcard(&self, key: &str) -> AppResult<u64> {
        let mut conn = self.connection.clone();
        let count: u64 = conn.zcard(key).await.map_err(store_error)?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(store_error)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> AppResult<()> {
        let mut conn = self.connection.clone();
        match ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl).await,
            None => conn.set::<_, _, ()>(key, value).await,
        }
        .map_err(store_error)?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl_seconds {
            cmd.arg("EX").arg(ttl);
        }
        // SET NX replies OK when the key was written and nil otherwise
        let reply: Option<String> = cmd
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(reply.is_some())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> AppResult<bool> {
        let script = redis::Script::new(COMPARE_AND_SET);
        let mut invocation = script.key(key);
        invocation.arg(expected).arg(value);
        if let Some(ttl) = ttl_seconds {
            invocation.arg(ttl);
        }
        let mut conn = self.connection.clone();
        let replaced: bool = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(replaced)
    }

    async fn incr(&self, key: &str, by: i64) -> AppResult<i64> {
        let mut conn = self.connection.clone();
        let value: i64 = conn.incr(key, by).await.map_err(store_error)?;
        Ok(value)
    }

    async fn expire(&self, key: &str, seconds: i64) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        let applied: bool = conn.expire(key, seconds).await.map_err(store_error)?;
        Ok(applied)
    }

    async fn ttl(&self, key: &str) -> AppResult<i64> {
        let mut conn = self.connection.clone();
        let ttl: i64 = conn.ttl(key).await.map_err(store_error)?;
        Ok(ttl)
    }

    async fn execute(&self, pipeline: Pipeline) -> AppResult<Vec<CommandResult>> {
        if pipeline.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        if pipeline.is_atomic() {
            pipe.atomic();
        }
        for command in pipeline.commands() {
            queue(&mut pipe, command);
        }

        // Raw replies keep per-command server errors in their slot;
        // `query_async` would turn the first one into an error for the batch.
        let mut conn = self.connection.clone();
        let values = if pipeline.is_atomic() {
            let mut replies = conn
                .req_packed_commands(&pipe, pipeline.len() + 1, 1)
                .await
                .map_err(store_error)?;
            match replies.pop() {
                Some(Value::Array(values)) => values,
                _ => return Err(AppError::internal("Transaction returned no reply array")),
            }
        } else {
            conn.req_packed_commands(&pipe, 0, pipeline.len())
                .await
                .map_err(store_error)?
        };

        if values.len() != pipeline.len() {
            return Err(AppError::internal(format!(
                "Pipeline returned {} replies for {} commands",
                values.len(),
                pipeline.len()
            )));
        }

        Ok(collect_results(pipeline.commands(), values))
    }
}

/// Pair each command with its raw reply, keeping failures per slot.
fn collect_results(commands: &[Command], values: Vec<Value>) -> Vec<CommandResult> {
    commands
        .iter()
        .zip(values)
        .map(|(command, value)| {
            let result = value
                .extract_error()
                .and_then(|value| decode(command, &value))
                .map_err(|e| e.to_string());
            if let Err(message) = &result {
                tracing::warn!(
                    command = command.name(),
                    key = command.key(),
                    "Pipeline command failed: {}",
                    message
                );
            }
            result
        })
        .collect()
}

/// Append one command to a Redis pipeline.
fn queue(pipe: &mut redis::Pipeline, command: &Command) {
    match command {
        Command::HGetAll { key } => {
            pipe.cmd("HGETALL").arg(key);
        }
        Command::HSet { key, fields } => {
            let cmd = pipe.cmd("HSET").arg(key);
            for (field, value) in fields {
                cmd.arg(field).arg(value);
            }
        }
        Command::Del { key } => {
            pipe.cmd("DEL").arg(key);
        }
        Command::Exists { key } => {
            pipe.cmd("EXISTS").arg(key);
        }
        Command::ZAdd { key, member, score } => {
            pipe.cmd("ZADD").arg(key).arg(*score).arg(member);
        }
        Command::ZRem { key, member } => {
            pipe.cmd("ZREM").arg(key).arg(member);
        }
        Command::ZRange { key, start, stop } => {
            pipe.cmd("ZRANGE").arg(key).arg(*start).arg(*stop);
        }
        Command::ZRevRange { key, start, stop } => {
            pipe.cmd("ZREVRANGE").arg(key).arg(*start).arg(*stop);
        }
        Command::ZCard { key } => {
            pipe.cmd("ZCARD").arg(key);
        }
        Command::Get { key } => {
            pipe.cmd("GET").arg(key);
        }
        Command::Set {
            key,
            value,
            ttl_seconds,
        } => {
            let cmd = pipe.cmd("SET").arg(key).arg(value);
            if let Some(ttl) = ttl_seconds {
                cmd.arg("EX").arg(*ttl);
            }
        }
        Command::SetNx {
            key,
            value,
            ttl_seconds,
        } => {
            let cmd = pipe.cmd("SET").arg(key).arg(value).arg("NX");
            if let Some(ttl) = ttl_seconds {
                cmd.arg("EX").arg(*ttl);
            }
        }
        Command::Incr { key, by } => {
            pipe.cmd("INCRBY").arg(key).arg(*by);
        }
        Command::Expire { key, seconds } => {
            pipe.cmd("EXPIRE").arg(key).arg(*seconds);
        }
        Command::Ttl { key } => {
            pipe.cmd("TTL").arg(key);
        }
    }
}

/// Convert a raw reply into the typed reply of its command.
fn decode(command: &Command, value: &Value) -> RedisResult<Reply> {
    let reply = match command {
        Command::HGetAll { .. } => Reply::Hash(Record::from_redis_value(value)?),
        Command::HSet { .. }
        | Command::Del { .. }
        | Command::ZAdd { .. }
        | Command::ZRem { .. }
        | Command::ZCard { .. }
        | Command::Incr { .. }
        | Command::Ttl { .. } => Reply::Int(i64::from_redis_value(value)?),
        Command::Exists { .. } | Command::Expire { .. } => {
            Reply::Bool(bool::from_redis_value(value)?)
        }
        Command::SetNx { .. } => Reply::Bool(Option::<String>::from_redis_value(value)?.is_some()),
        Command::ZRange { .. } | Command::ZRevRange { .. } => {
            Reply::Members(Vec::<String>::from_redis_value(value)?)
        }
        Command::Get { .. } => match Option::<String>::from_redis_value(value)? {
            Some(text) => Reply::Text(text),
            None => Reply::Nil,
        },
        Command::Set { .. } => {
            String::from_redis_value(value)?;
            Reply::Ok
        }
    };
    Ok(reply)
}

/// Convert Redis error to AppError.
fn store_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::Store(e)
}
