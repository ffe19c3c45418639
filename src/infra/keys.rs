//! Key namespacing.
//!
//! Layout:
//!
//! ```text
//! {prefix}:{entity}:{id}          hash, one field per attribute
//! {prefix}:{entity}:list          sorted set, member = id, score = created epoch-millis
//! {prefix}:{entity}:index:{f}:{v} string (unique index) or sorted set (membership index)
//! ```

use crate::config::{INDEX_KEY_PART, KEY_DELIMITER, LIST_KEY_SUFFIX};
use crate::errors::{AppError, AppResult};

/// Reject ids whose record key would land on the list key or inside the
/// index namespace.
pub fn check_id(id: &str) -> AppResult<()> {
    if id.is_empty() {
        return Err(AppError::validation("Id cannot be empty"));
    }
    if id == LIST_KEY_SUFFIX || id == INDEX_KEY_PART {
        return Err(AppError::validation(format!("Id '{}' is reserved", id)));
    }
    if id.contains(KEY_DELIMITER) {
        return Err(AppError::validation(format!(
            "Id cannot contain '{}'",
            KEY_DELIMITER
        )));
    }
    Ok(())
}

/// Application key namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Join the prefix and `parts` with the key delimiter.
    pub fn generate_key(&self, parts: &[&str]) -> String {
        let mut key = self.prefix.clone();
        for part in parts {
            key.push_str(KEY_DELIMITER);
            key.push_str(part);
        }
        key
    }

    /// Hash record key of one entity instance.
    pub fn record_key(&self, entity: &str, id: &str) -> String {
        self.generate_key(&[entity, id])
    }

    /// Membership sorted set of an entity type.
    pub fn list_key(&self, entity: &str) -> String {
        self.generate_key(&[entity, LIST_KEY_SUFFIX])
    }

    /// Secondary index key for `field = value`.
    pub fn index_key(&self, entity: &str, field: &str, value: &str) -> String {
        self.generate_key(&[entity, INDEX_KEY_PART, field, value])
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_KEY_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        let keys = KeySpace::new("app");
        assert_eq!(keys.generate_key(&[]), "app");
        assert_eq!(keys.generate_key(&["user", "42"]), "app:user:42");
    }

    #[test]
    fn test_layout() {
        let keys = KeySpace::new("calendar");
        assert_eq!(keys.record_key("todo", "t1"), "calendar:todo:t1");
        assert_eq!(keys.list_key("todo"), "calendar:todo:list");
        assert_eq!(
            keys.index_key("user", "email", "a@x.com"),
            "calendar:user:index:email:a@x.com"
        );
    }

    #[test]
    fn test_check_id() {
        assert!(check_id("usr_lq2x9k4a_7f3a9b2c").is_ok());
        assert!(check_id("custom-id").is_ok());

        for id in ["", "list", "index", "index:email:a@x.com", "a:b"] {
            assert!(
                matches!(check_id(id), Err(AppError::Validation(_))),
                "{} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_entity_names_do_not_collide() {
        let keys = KeySpace::default();
        assert_ne!(keys.list_key("user"), keys.list_key("todo"));
        assert_ne!(keys.record_key("user", "1"), keys.record_key("category", "1"));
    }
}
