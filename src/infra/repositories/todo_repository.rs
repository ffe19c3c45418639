//! Todo repository, indexed by owner.

use chrono::SubsecRound;
use std::sync::Arc;

use super::base::RedisRepository;
use super::record::RecordExt;
use crate::config::{ENTITY_TODO, ID_PREFIX_TODO, INDEX_FIELD_USER};
use crate::domain::{NewTodo, Todo, TodoChanges};
use crate::errors::AppResult;
use crate::infra::keys::KeySpace;
use crate::infra::store::{KeyValueStore, Pipeline, Record};
use crate::types::{Page, PageRequest};
use crate::utils::generate_id;
use crate::utils::serialization::{
    now, serialize_array, serialize_boolean, serialize_date, serialize_optional_date,
    serialize_optional_string,
};

const FIELD_ID: &str = "id";
const FIELD_USER_ID: &str = "userId";
const FIELD_CATEGORY_ID: &str = "categoryId";
const FIELD_TITLE: &str = "title";
const FIELD_DESCRIPTION: &str = "description";
const FIELD_COMPLETED: &str = "completed";
const FIELD_DUE_DATE: &str = "dueDate";
const FIELD_TAGS: &str = "tags";
const FIELD_CREATED_AT: &str = "createdAt";
const FIELD_UPDATED_AT: &str = "updatedAt";

pub struct TodoStore {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
}

impl TodoStore {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    fn user_key(&self, user_id: &str) -> String {
        self.index_key(INDEX_FIELD_USER, user_id)
    }

    /// One page of a user's todos, newest first
    pub async fn find_by_user(
        &self,
        user_id: &str,
        request: &PageRequest,
    ) -> AppResult<Page<Todo>> {
        self.paginate_members(&self.user_key(user_id), request).await
    }

    /// Flip the completion flag; `None` if the todo does not exist
    pub async fn toggle_completed(&self, id: &str) -> AppResult<Option<Todo>> {
        let Some(todo) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let changes = TodoChanges {
            completed: Some(!todo.completed),
            ..TodoChanges::default()
        };
        self.update(id, changes).await
    }
}

impl RedisRepository for TodoStore {
    type Entity = Todo;
    type Create = NewTodo;
    type Update = TodoChanges;

    fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    fn keys(&self) -> &KeySpace {
        &self.keys
    }

    fn entity_name(&self) -> &'static str {
        ENTITY_TODO
    }

    fn serialize(&self, todo: &Todo) -> Record {
        [
            (FIELD_ID, todo.id.clone()),
            (FIELD_USER_ID, todo.user_id.clone()),
            (
                FIELD_CATEGORY_ID,
                serialize_optional_string(todo.category_id.as_deref()),
            ),
            (FIELD_TITLE, todo.title.clone()),
            (
                FIELD_DESCRIPTION,
                serialize_optional_string(todo.description.as_deref()),
            ),
            (FIELD_COMPLETED, serialize_boolean(todo.completed)),
            (FIELD_DUE_DATE, serialize_optional_date(todo.due_date.as_ref())),
            (FIELD_TAGS, serialize_array(&todo.tags)),
            (FIELD_CREATED_AT, serialize_date(&todo.created_at)),
            (FIELD_UPDATED_AT, serialize_date(&todo.updated_at)),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
    }

    fn deserialize(&self, record: Record) -> Result<Todo, String> {
        Ok(Todo {
            id: record.required(FIELD_ID)?,
            user_id: record.required(FIELD_USER_ID)?,
            category_id: record.optional(FIELD_CATEGORY_ID),
            title: record.required(FIELD_TITLE)?,
            description: record.optional(FIELD_DESCRIPTION),
            completed: record.flag(FIELD_COMPLETED),
            due_date: record.optional_date(FIELD_DUE_DATE),
            tags: record.list(FIELD_TAGS),
            created_at: record.required_date(FIELD_CREATED_AT)?,
            updated_at: record.required_date(FIELD_UPDATED_AT)?,
        })
    }

    fn create_entity(&self, data: NewTodo) -> Todo {
        let timestamp = now();
        Todo {
            id: data
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| generate_id(Some(ID_PREFIX_TODO))),
            user_id: data.user_id,
            category_id: data.category_id.filter(|id| !id.is_empty()),
            title: data.title,
            description: data.description.filter(|text| !text.is_empty()),
            completed: data.completed.unwrap_or(false),
            due_date: data.due_date.map(|date| date.trunc_subsecs(3)),
            tags: data.tags,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    fn update_entity(&self, existing: &Todo, changes: TodoChanges) -> Todo {
        Todo {
            id: existing.id.clone(),
            user_id: existing.user_id.clone(),
            category_id: match changes.category_id {
                Some(category_id) => category_id.filter(|id| !id.is_empty()),
                None => existing.category_id.clone(),
            },
            title: changes.title.unwrap_or_else(|| existing.title.clone()),
            description: match changes.description {
                Some(description) => description.filter(|text| !text.is_empty()),
                None => existing.description.clone(),
            },
            completed: changes.completed.unwrap_or(existing.completed),
            due_date: changes
                .due_date
                .map(|date| date.map(|date| date.trunc_subsecs(3)))
                .unwrap_or(existing.due_date),
            tags: changes.tags.unwrap_or_else(|| existing.tags.clone()),
            created_at: existing.created_at,
            updated_at: now(),
        }
    }

    fn update_indexes(&self, pipeline: &mut Pipeline, todo: &Todo, previous: Option<&Todo>) {
        if previous.is_none() {
            pipeline.zadd(
                self.user_key(&todo.user_id),
                todo.id.clone(),
                todo.created_at.timestamp_millis() as f64,
            );
        }
    }

    fn remove_from_indexes(&self, pipeline: &mut Pipeline, todo: &Todo) {
        pipeline.zrem(self.user_key(&todo.user_id), todo.id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    fn repository() -> TodoStore {
        TodoStore::new(Arc::new(MemoryStore::new()), KeySpace::new("test"))
    }

    fn new_todo(user_id: &str, title: &str) -> NewTodo {
        NewTodo {
            user_id: user_id.to_string(),
            title: title.to_string(),
            ..NewTodo::default()
        }
    }

    #[test]
    fn test_round_trip_with_optionals() {
        let repo = repository();
        let mut todo = repo.create_entity(new_todo("usr_1", "Buy milk"));
        assert!(todo.id.starts_with("todo_"));
        assert_eq!(repo.deserialize(repo.serialize(&todo)).unwrap(), todo);

        todo.category_id = Some("cat_1".to_string());
        todo.description = Some("2 litres".to_string());
        todo.due_date = Some(todo.created_at + Duration::days(2));
        todo.tags = vec!["home".to_string(), "weekly".to_string()];
        assert_eq!(repo.deserialize(repo.serialize(&todo)).unwrap(), todo);
    }

    #[test]
    fn test_corrupt_tags_fall_back_to_empty() {
        let repo = repository();
        let todo = repo.create_entity(new_todo("usr_1", "Buy milk"));
        let mut record = repo.serialize(&todo);
        record.insert(FIELD_TAGS.to_string(), "not json".to_string());

        assert!(repo.deserialize(record).unwrap().tags.is_empty());
    }

    #[test]
    fn test_update_clears_optionals() {
        let repo = repository();
        let todo = repo.create_entity(NewTodo {
            description: Some("notes".to_string()),
            due_date: Some(Utc::now()),
            ..new_todo("usr_1", "Buy milk")
        });

        let updated = repo.update_entity(
            &todo,
            TodoChanges {
                description: Some(None),
                due_date: Some(None),
                ..TodoChanges::default()
            },
        );
        assert_eq!(updated.description, None);
        assert_eq!(updated.due_date, None);
        assert_eq!(updated.title, todo.title);
        assert_eq!(updated.id, todo.id);
    }

    #[tokio::test]
    async fn test_due_date_stored_at_millisecond_precision() {
        let repo = repository();
        let due = Utc.timestamp_nanos(1_700_000_000_123_456_789);
        let todo = repo
            .create(NewTodo {
                due_date: Some(due),
                ..new_todo("usr_1", "Buy milk")
            })
            .await
            .unwrap();

        assert_eq!(todo.due_date, Some(Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()));
        assert_eq!(repo.find_by_id(&todo.id).await.unwrap().unwrap(), todo);

        let moved = repo
            .update(
                &todo.id,
                TodoChanges {
                    due_date: Some(Some(due + Duration::days(1))),
                    ..TodoChanges::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repo.find_by_id(&todo.id).await.unwrap().unwrap(), moved);
    }

    #[tokio::test]
    async fn test_toggle_completed() {
        let repo = repository();
        let todo = repo.create(new_todo("usr_1", "Buy milk")).await.unwrap();
        assert!(!todo.completed);

        let done = repo.toggle_completed(&todo.id).await.unwrap().unwrap();
        assert!(done.completed);
        let reopened = repo.toggle_completed(&todo.id).await.unwrap().unwrap();
        assert!(!reopened.completed);

        assert!(repo.toggle_completed("todo_missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_user_pages() {
        let repo = repository();
        for i in 0..5 {
            repo.create(new_todo("usr_1", &format!("Task {}", i)))
                .await
                .unwrap();
        }
        repo.create(new_todo("usr_2", "Other")).await.unwrap();

        let page = repo
            .find_by_user("usr_1", &PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_next);
        assert!(page.has_prev);
        assert!(page.items.iter().all(|todo| todo.user_id == "usr_1"));
    }
}
