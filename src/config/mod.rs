//! Configuration module
//!
//! Key prefixes, entity names and pagination limits live in `constants`;
//! the Redis connection settings are read from the environment by `Config`.

mod constants;
mod settings;

pub use constants::*;
pub use settings::Config;
