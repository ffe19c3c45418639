//! Application services layer - Use cases and business logic.
//!
//! Services depend on repository traits, not on the store, so they can be
//! tested against mocks.

mod user_service;

pub use user_service::{UserManager, UserService};
