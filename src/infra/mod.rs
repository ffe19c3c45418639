//! Infrastructure layer - External systems integration
//!
//! - Key layout of the Redis namespace
//! - Key-value store clients (Redis and in-process)
//! - Repositories built on top of them

pub mod keys;
pub mod repositories;
pub mod store;

pub use keys::KeySpace;
pub use repositories::{CategoryStore, RedisRepository, TodoStore, UserRepository, UserStore};
pub use store::{KeyValueStore, MemoryStore, Pipeline, RedisStore};

#[cfg(any(test, feature = "test-utils"))]
pub use repositories::MockUserRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use store::MockKeyValueStore;
