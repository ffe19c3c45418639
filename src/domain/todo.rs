//! Todo domain entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;

/// A to-do item, optionally scheduled and categorised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub user_id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Whether the todo is open and its due date has passed
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }
}

impl Entity for Todo {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTodo {
    pub id: Option<String>,
    pub user_id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a todo; the owner cannot change.
///
/// For the doubly optional fields, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TodoChanges {
    pub category_id: Option<Option<String>>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let mut todo = Todo {
            id: "todo_1".to_string(),
            user_id: "usr_1".to_string(),
            category_id: None,
            title: "File taxes".to_string(),
            description: None,
            completed: false,
            due_date: Some(now - Duration::days(1)),
            tags: vec![],
            created_at: now,
            updated_at: now,
        };
        assert!(todo.is_overdue(now));

        todo.completed = true;
        assert!(!todo.is_overdue(now));

        todo.completed = false;
        todo.due_date = None;
        assert!(!todo.is_overdue(now));
    }
}
