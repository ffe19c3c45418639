//! Repository engine tests against the in-process store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use calendar_store::domain::{Entity, NewUser, UserChanges};
use calendar_store::errors::AppError;
use calendar_store::infra::repositories::RecordExt;
use calendar_store::infra::store::Record;
use calendar_store::infra::{
    KeySpace, KeyValueStore, MemoryStore, RedisRepository, UserRepository, UserStore,
};
use calendar_store::services::{UserManager, UserService};
use calendar_store::types::PageRequest;
use calendar_store::utils::generate_id;
use calendar_store::utils::serialization::{now, serialize_date};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: String,
    name: String,
    value: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Entity for Item {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Default)]
struct NewItem {
    id: Option<String>,
    name: String,
    value: i64,
}

/// Loosely typed patch: carries `id` and `created_at` like an untrusted payload
#[derive(Default)]
struct ItemPatch {
    id: Option<String>,
    name: Option<String>,
    value: Option<i64>,
    created_at: Option<DateTime<Utc>>,
}

struct ItemStore {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
}

impl RedisRepository for ItemStore {
    type Entity = Item;
    type Create = NewItem;
    type Update = ItemPatch;

    fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    fn keys(&self) -> &KeySpace {
        &self.keys
    }

    fn entity_name(&self) -> &'static str {
        "item"
    }

    fn serialize(&self, item: &Item) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), item.id.clone());
        record.insert("name".to_string(), item.name.clone());
        record.insert("value".to_string(), item.value.to_string());
        record.insert("createdAt".to_string(), serialize_date(&item.created_at));
        record.insert("updatedAt".to_string(), serialize_date(&item.updated_at));
        record
    }

    fn deserialize(&self, record: Record) -> Result<Item, String> {
        Ok(Item {
            id: record.required("id")?,
            name: record.required("name")?,
            value: record
                .required("value")?
                .parse()
                .map_err(|e| format!("invalid value: {}", e))?,
            created_at: record.required_date("createdAt")?,
            updated_at: record.required_date("updatedAt")?,
        })
    }

    fn create_entity(&self, data: NewItem) -> Item {
        let timestamp = now();
        Item {
            id: data.id.unwrap_or_else(|| generate_id(Some("item"))),
            name: data.name,
            value: data.value,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    fn update_entity(&self, existing: &Item, patch: ItemPatch) -> Item {
        // id and created_at never come from a patch
        let _ = (patch.id, patch.created_at);
        Item {
            id: existing.id.clone(),
            name: patch.name.unwrap_or_else(|| existing.name.clone()),
            value: patch.value.unwrap_or(existing.value),
            created_at: existing.created_at,
            updated_at: now(),
        }
    }
}

fn item_store() -> (ItemStore, MemoryStore) {
    let memory = MemoryStore::new();
    let repo = ItemStore {
        store: Arc::new(memory.clone()),
        keys: KeySpace::new("test"),
    };
    (repo, memory)
}

fn new_item(name: &str, value: i64) -> NewItem {
    NewItem {
        id: None,
        name: name.to_string(),
        value,
    }
}

#[tokio::test]
async fn test_create_then_read() {
    let (repo, _) = item_store();

    let item = repo.create(new_item("Test Item", 42)).await.unwrap();
    assert!(!item.id.is_empty());
    assert_eq!(item.name, "Test Item");
    assert_eq!(item.value, 42);
    assert_eq!(item.created_at, item.updated_at);

    let found = repo.find_by_id(&item.id).await.unwrap().unwrap();
    assert_eq!(found, item);
    assert!(repo.exists(&item.id).await.unwrap());
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_layout_in_store() {
    let (repo, memory) = item_store();
    let item = repo.create(new_item("Test Item", 42)).await.unwrap();

    let record = memory.hgetall(&format!("test:item:{}", item.id)).await.unwrap();
    assert_eq!(record.get("value").map(String::as_str), Some("42"));
    assert_eq!(
        memory.zrange("test:item:list", 0, -1).await.unwrap(),
        vec![item.id.clone()]
    );
}

#[tokio::test]
async fn test_update_keeps_id_and_created_at() {
    let (repo, _) = item_store();
    let item = repo.create(new_item("Test Item", 42)).await.unwrap();

    let patch = ItemPatch {
        id: Some("hijacked".to_string()),
        name: Some("Renamed".to_string()),
        created_at: Some(Utc::now() + chrono::Duration::days(365)),
        ..ItemPatch::default()
    };
    let updated = repo.update(&item.id, patch).await.unwrap().unwrap();

    assert_eq!(updated.id, item.id);
    assert_eq!(updated.created_at, item.created_at);
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.value, 42);
    assert!(repo.find_by_id("hijacked").await.unwrap().is_none());
    assert_eq!(repo.find_by_id(&item.id).await.unwrap().unwrap(), updated);
}

#[tokio::test]
async fn test_colliding_ids_write_nothing() {
    let (repo, memory) = item_store();

    for id in ["list", "index", "a:index:b", ""] {
        let result = repo
            .create(NewItem {
                id: Some(id.to_string()),
                ..new_item("x", 1)
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))), "{:?}", id);
    }
    assert_eq!(memory.dbsize().await, 0);

    let custom = repo
        .create(NewItem {
            id: Some("custom-id".to_string()),
            ..new_item("x", 1)
        })
        .await
        .unwrap();
    assert_eq!(repo.find_by_id("custom-id").await.unwrap(), Some(custom));
}

#[tokio::test]
async fn test_update_missing_writes_nothing() {
    let (repo, memory) = item_store();

    let patch = ItemPatch {
        name: Some("x".to_string()),
        ..ItemPatch::default()
    };
    assert!(repo.update("nonexistent-id", patch).await.unwrap().is_none());
    assert_eq!(memory.dbsize().await, 0);
}

#[tokio::test]
async fn test_delete_missing_returns_false() {
    let (repo, memory) = item_store();
    assert!(!repo.delete("nonexistent-id").await.unwrap());
    assert_eq!(memory.dbsize().await, 0);
}

#[tokio::test]
async fn test_delete_removes_from_list() {
    let (repo, _) = item_store();
    let keep = repo.create(new_item("keep", 1)).await.unwrap();
    let gone = repo.create(new_item("gone", 2)).await.unwrap();

    assert!(repo.delete(&gone.id).await.unwrap());

    let all = repo.find_all().await.unwrap();
    assert_eq!(all, vec![keep]);
    assert!(repo.find_by_id(&gone.id).await.unwrap().is_none());
    assert!(!repo.delete(&gone.id).await.unwrap());
}

#[tokio::test]
async fn test_find_by_ids_skips_missing_and_keeps_order() {
    let (repo, _) = item_store();
    let a = repo.create(new_item("a", 1)).await.unwrap();
    let b = repo.create(new_item("b", 2)).await.unwrap();

    let ids = vec![b.id.clone(), "missing".to_string(), a.id.clone()];
    let found = repo.find_by_ids(&ids).await.unwrap();
    assert_eq!(found, vec![b, a]);
    assert!(repo.find_by_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_record_is_an_error_on_direct_read() {
    let (repo, memory) = item_store();
    let item = repo.create(new_item("a", 1)).await.unwrap();

    let key = format!("test:item:{}", item.id);
    let mut record = Record::new();
    record.insert("value".to_string(), "NaN-ish".to_string());
    memory.hset_multiple(&key, &record).await.unwrap();

    let result = repo.find_by_id(&item.id).await;
    assert!(matches!(result, Err(AppError::Corrupt { .. })));

    // Batch reads skip it instead
    assert!(repo.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pagination_over_fifteen_items() {
    let (repo, _) = item_store();
    for i in 0..15 {
        repo.create(new_item(&format!("Item {}", i), i)).await.unwrap();
        // Distinct creation scores
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let first = repo.find_paginated(&PageRequest::new(1, 10)).await.unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total, 15);
    assert!(first.has_next);
    assert!(!first.has_prev);
    assert_eq!(first.items[0].name, "Item 14");

    let second = repo.find_paginated(&PageRequest::new(2, 10)).await.unwrap();
    assert_eq!(second.items.len(), 5);
    assert!(!second.has_next);
    assert!(second.has_prev);
    assert_eq!(second.items[4].name, "Item 0");

    let ids: HashSet<String> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|item| item.id.clone())
        .collect();
    assert_eq!(ids.len(), 15);

    let beyond = repo.find_paginated(&PageRequest::new(3, 10)).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 15);
    assert!(!beyond.has_next);
}

#[tokio::test]
async fn test_pagination_edge_requests() {
    let (repo, _) = item_store();
    for i in 0..3 {
        repo.create(new_item(&format!("Item {}", i), i)).await.unwrap();
    }

    let page_zero = repo.find_paginated(&PageRequest::new(0, 2)).await.unwrap();
    assert_eq!(page_zero.page, 1);
    assert_eq!(page_zero.items.len(), 2);

    let empty = repo.find_paginated(&PageRequest::new(1, 0)).await.unwrap();
    assert!(empty.items.is_empty());
    assert_eq!(empty.total, 3);

    let capped = repo.find_paginated(&PageRequest::new(1, 10_000)).await.unwrap();
    assert_eq!(capped.limit, 100);
    assert_eq!(capped.items.len(), 3);
}

#[tokio::test]
async fn test_concurrent_creates_are_all_listed() {
    let (repo, _) = item_store();
    let repo = Arc::new(repo);

    let tasks = (0..20).map(|i| {
        let repo = repo.clone();
        async move { repo.create(new_item(&format!("Item {}", i), i)).await }
    });
    let created = join_all(tasks).await;

    assert!(created.iter().all(Result::is_ok));
    assert_eq!(repo.count().await.unwrap(), 20);
    assert_eq!(repo.find_all().await.unwrap().len(), 20);
}

fn user_store(memory: &MemoryStore) -> Arc<UserStore> {
    Arc::new(UserStore::new(Arc::new(memory.clone()), KeySpace::new("test")))
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password_hash: "hashed".to_string(),
        name: "Test User".to_string(),
        ..NewUser::default()
    }
}

#[tokio::test]
async fn test_email_index_follows_updates() {
    let memory = MemoryStore::new();
    let users = user_store(&memory);

    let user = UserRepository::create(users.as_ref(), new_user("a@x.com"))
        .await
        .unwrap();
    assert_eq!(
        users.find_by_email("A@X.COM").await.unwrap().unwrap().id,
        user.id
    );

    let changes = UserChanges {
        email: Some("b@x.com".to_string()),
        ..UserChanges::default()
    };
    UserRepository::update(users.as_ref(), &user.id, changes)
        .await
        .unwrap()
        .unwrap();

    assert!(users.find_by_email("a@x.com").await.unwrap().is_none());
    assert_eq!(
        users.find_by_email("b@x.com").await.unwrap().unwrap().id,
        user.id
    );
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let memory = MemoryStore::new();
    let service = UserManager::new(user_store(&memory));
    let request = calendar_store::domain::RegisterUser {
        email: "dup@x.com".to_string(),
        password_hash: "hashed".to_string(),
        name: "Dup".to_string(),
        profile_image: None,
    };

    service.register(request.clone()).await.unwrap();
    let second = service.register(request).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    let page = service.list_users(&PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].email, "dup@x.com");
}

#[tokio::test]
async fn test_registration_after_stale_email_entry() {
    let memory = MemoryStore::new();
    memory
        .set("test:user:index:email:ghost@x.com", "usr_gone", None)
        .await
        .unwrap();
    let users = user_store(&memory);
    assert!(users.find_by_email("ghost@x.com").await.unwrap().is_none());

    let service = UserManager::new(users.clone());
    let user = service
        .register(calendar_store::domain::RegisterUser {
            email: "ghost@x.com".to_string(),
            password_hash: "hashed".to_string(),
            name: "Ghost".to_string(),
            profile_image: None,
        })
        .await
        .unwrap();

    assert_eq!(service.get_user_by_email("GHOST@x.com").await.unwrap().id, user.id);
}

#[tokio::test]
async fn test_concurrent_registration_keeps_one_user() {
    let memory = MemoryStore::new();
    let users = user_store(&memory);

    let tasks = (0..10).map(|_| {
        let users = users.clone();
        async move { UserRepository::create(users.as_ref(), new_user("race@x.com")).await }
    });
    let results = join_all(tasks).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let page = UserRepository::list(users.as_ref(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(memory.keys().await.len(), 3);
}
