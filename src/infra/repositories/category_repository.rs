//! Category repository, indexed by owner.

use std::sync::Arc;

use super::base::RedisRepository;
use super::record::RecordExt;
use crate::config::{
    DEFAULT_CATEGORY_COLOR, ENTITY_CATEGORY, ID_PREFIX_CATEGORY, INDEX_FIELD_USER,
};
use crate::domain::{Category, CategoryChanges, NewCategory};
use crate::errors::AppResult;
use crate::infra::keys::KeySpace;
use crate::infra::store::{KeyValueStore, Pipeline, Record};
use crate::types::{Page, PageRequest};
use crate::utils::generate_id;
use crate::utils::serialization::{now, serialize_date};

const FIELD_ID: &str = "id";
const FIELD_USER_ID: &str = "userId";
const FIELD_NAME: &str = "name";
const FIELD_COLOR: &str = "color";
const FIELD_CREATED_AT: &str = "createdAt";
const FIELD_UPDATED_AT: &str = "updatedAt";

pub struct CategoryStore {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
}

impl CategoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    fn user_key(&self, user_id: &str) -> String {
        self.index_key(INDEX_FIELD_USER, user_id)
    }

    /// One page of a user's categories, newest first
    pub async fn find_by_user(
        &self,
        user_id: &str,
        request: &PageRequest,
    ) -> AppResult<Page<Category>> {
        self.paginate_members(&self.user_key(user_id), request).await
    }
}

impl RedisRepository for CategoryStore {
    type Entity = Category;
    type Create = NewCategory;
    type Update = CategoryChanges;

    fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    fn keys(&self) -> &KeySpace {
        &self.keys
    }

    fn entity_name(&self) -> &'static str {
        ENTITY_CATEGORY
    }

    fn serialize(&self, category: &Category) -> Record {
        [
            (FIELD_ID, category.id.clone()),
            (FIELD_USER_ID, category.user_id.clone()),
            (FIELD_NAME, category.name.clone()),
            (FIELD_COLOR, category.color.clone()),
            (FIELD_CREATED_AT, serialize_date(&category.created_at)),
            (FIELD_UPDATED_AT, serialize_date(&category.updated_at)),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
    }

    fn deserialize(&self, record: Record) -> Result<Category, String> {
        Ok(Category {
            id: record.required(FIELD_ID)?,
            user_id: record.required(FIELD_USER_ID)?,
            name: record.required(FIELD_NAME)?,
            color: record
                .optional(FIELD_COLOR)
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            created_at: record.required_date(FIELD_CREATED_AT)?,
            updated_at: record.required_date(FIELD_UPDATED_AT)?,
        })
    }

    fn create_entity(&self, data: NewCategory) -> Category {
        let timestamp = now();
        Category {
            id: data
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| generate_id(Some(ID_PREFIX_CATEGORY))),
            user_id: data.user_id,
            name: data.name,
            color: data
                .color
                .filter(|color| !color.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    fn update_entity(&self, existing: &Category, changes: CategoryChanges) -> Category {
        Category {
            name: changes.name.unwrap_or_else(|| existing.name.clone()),
            color: changes
                .color
                .filter(|color| !color.is_empty())
                .unwrap_or_else(|| existing.color.clone()),
            updated_at: now(),
            ..existing.clone()
        }
    }

    fn update_indexes(
        &self,
        pipeline: &mut Pipeline,
        category: &Category,
        previous: Option<&Category>,
    ) {
        // Owner is fixed, so the membership only needs writing once
        if previous.is_none() {
            pipeline.zadd(
                self.user_key(&category.user_id),
                category.id.clone(),
                category.created_at.timestamp_millis() as f64,
            );
        }
    }

    fn remove_from_indexes(&self, pipeline: &mut Pipeline, category: &Category) {
        pipeline.zrem(self.user_key(&category.user_id), category.id.clone());
    }
}
