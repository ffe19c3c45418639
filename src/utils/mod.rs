//! Utility functions shared by the repositories.

pub mod id;
pub mod serialization;

pub use id::{generate_id, generate_uuid};
