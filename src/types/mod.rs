//! Shared types used across repositories and services.

mod pagination;

pub use pagination::{Page, PageRequest, SortOrder};
