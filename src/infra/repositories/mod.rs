//! Repository layer - Redis-backed data access
//!
//! [`RedisRepository`] carries the storage layout shared by every entity;
//! the concrete stores add field mapping and their secondary indexes.

mod base;
mod category_repository;
mod record;
mod todo_repository;
mod user_repository;

pub use base::RedisRepository;
pub use category_repository::CategoryStore;
pub use record::RecordExt;
pub use todo_repository::TodoStore;
pub use user_repository::{UserRepository, UserStore};

// Export mock for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
