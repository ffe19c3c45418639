//! Application-wide constants
//!
//! Centralized location for magic values to improve maintainability.

// =============================================================================
// Pagination
// =============================================================================

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum allowed items per page to prevent excessive range reads
pub const MAX_PAGE_SIZE: u64 = 100;

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

// =============================================================================
// Key-Value Store (Redis)
// =============================================================================

/// Default Redis URL (for development)
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default application prefix for every key
pub const DEFAULT_KEY_PREFIX: &str = "calendar";

/// Delimiter between key parts
pub const KEY_DELIMITER: &str = ":";

/// Suffix of the sorted set holding every id of an entity type
pub const LIST_KEY_SUFFIX: &str = "list";

/// Key part introducing a secondary index
pub const INDEX_KEY_PART: &str = "index";

/// Lifetime of an email claim until the user write that made it commits
pub const EMAIL_CLAIM_TTL_SECONDS: u64 = 30;

// =============================================================================
// Entities
// =============================================================================

/// Entity name for users
pub const ENTITY_USER: &str = "user";

/// Entity name for categories
pub const ENTITY_CATEGORY: &str = "category";

/// Entity name for todos
pub const ENTITY_TODO: &str = "todo";

/// Indexed field: user email
pub const INDEX_FIELD_EMAIL: &str = "email";

/// Indexed field: owning user id
pub const INDEX_FIELD_USER: &str = "user";

/// ID prefix for generated user ids
pub const ID_PREFIX_USER: &str = "usr";

/// ID prefix for generated category ids
pub const ID_PREFIX_CATEGORY: &str = "cat";

/// ID prefix for generated todo ids
pub const ID_PREFIX_TODO: &str = "todo";

/// Default category color
pub const DEFAULT_CATEGORY_COLOR: &str = "#3b82f6";
