//! Application settings loaded from environment variables.

use std::env;

use super::constants::{DEFAULT_KEY_PREFIX, DEFAULT_PAGE_SIZE, DEFAULT_REDIS_URL, MAX_PAGE_SIZE};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub redis_url: String,
    pub key_prefix: String,
    pub default_page_size: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("redis_url", &"[REDACTED]")
            .field("key_prefix", &self.key_prefix)
            .field("default_page_size", &self.default_page_size)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let key_prefix = env::var("KEY_PREFIX")
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());

        Self {
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            key_prefix,
            default_page_size: env::var("DEFAULT_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|size: u64| size.clamp(1, MAX_PAGE_SIZE))
                .unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
