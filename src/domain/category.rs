//! Category domain entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;

/// A user-owned grouping for todos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Category {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCategory {
    pub id: Option<String>,
    pub user_id: String,
    pub name: String,
    /// Defaults to the application color
    pub color: Option<String>,
}

/// Partial update of a category; the owner cannot change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub color: Option<String>,
}
