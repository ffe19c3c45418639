//! Generic Redis repository engine.
//!
//! An entity type is stored as:
//! - one hash per instance at `{prefix}:{entity}:{id}`,
//! - one sorted set `{prefix}:{entity}:list` holding every id, scored by
//!   creation time in epoch-millis,
//! - optional secondary index keys maintained by the concrete repository.
//!
//! Implementors supply the entity shape (serialization, construction,
//! merging) and, when they own indexes, the two index hooks. Every other
//! operation comes from the default methods of [`RedisRepository`].
//!
//! Writes of one call (hash, list entry, index entries) are queued in a single
//! atomic pipeline. The read that precedes `update` and `delete` is a separate
//! round trip, so two concurrent updates of the same id may both read the same
//! state and the second write wins.

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::Entity;
use crate::errors::{AppError, AppResult};
use crate::infra::keys::{check_id, KeySpace};
use crate::infra::store::{CommandResult, KeyValueStore, Pipeline, Record, Reply};
use crate::types::{Page, PageRequest};

/// CRUD, listing and pagination over hash-stored entities.
#[async_trait]
pub trait RedisRepository: Send + Sync {
    /// Stored entity
    type Entity: Entity;
    /// Creation input (fields the caller may supply)
    type Create: Send + 'static;
    /// Partial update input
    type Update: Send + 'static;

    /// Backing store
    fn store(&self) -> &dyn KeyValueStore;

    /// Key namespace
    fn keys(&self) -> &KeySpace;

    /// Namespace discriminator, unique per entity type
    fn entity_name(&self) -> &'static str;

    /// Every persisted field as a string.
    fn serialize(&self, entity: &Self::Entity) -> Record;

    /// Inverse of [`serialize`](Self::serialize). Missing optional fields are
    /// tolerated; a missing or unreadable required field is an error message.
    fn deserialize(&self, record: Record) -> Result<Self::Entity, String>;

    /// Build a full entity: assign an id if none was given, fill defaults and
    /// set both timestamps.
    fn create_entity(&self, data: Self::Create) -> Self::Entity;

    /// Merge `updates` onto `existing`. The id and the creation time must be
    /// kept from `existing`; the update time is refreshed.
    fn update_entity(&self, existing: &Self::Entity, updates: Self::Update) -> Self::Entity;

    /// Queue index maintenance for a write. `previous` is `None` on create.
    ///
    /// Must queue removal of entries for indexed values that changed before
    /// queueing the new entries.
    fn update_indexes(
        &self,
        _pipeline: &mut Pipeline,
        _entity: &Self::Entity,
        _previous: Option<&Self::Entity>,
    ) {
    }

    /// Queue removal of every index entry owned by `entity`.
    fn remove_from_indexes(&self, _pipeline: &mut Pipeline, _entity: &Self::Entity) {}

    /// Hash key of one instance
    fn entity_key(&self, id: &str) -> String {
        self.keys().record_key(self.entity_name(), id)
    }

    /// Membership sorted set of this entity type
    fn list_key(&self) -> String {
        self.keys().list_key(self.entity_name())
    }

    /// Secondary index key for `field = value`
    fn index_key(&self, field: &str, value: &str) -> String {
        self.keys().index_key(self.entity_name(), field, value)
    }

    /// Find entity by id; `None` if the hash is absent or empty
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Self::Entity>> {
        let key = self.entity_key(id);
        let record = self.store().hgetall(&key).await?;
        if record.is_empty() {
            return Ok(None);
        }

        self.deserialize(record)
            .map(Some)
            .map_err(|reason| AppError::corrupt(key, reason))
    }

    /// All entities in ascending creation order
    async fn find_all(&self) -> AppResult<Vec<Self::Entity>> {
        let ids = self.store().zrange(&self.list_key(), 0, -1).await?;
        self.find_by_ids(&ids).await
    }

    /// Fetch several entities in one round trip, preserving the order of `ids`.
    ///
    /// Ids whose hash is missing, unreadable or failed to load are skipped and
    /// only logged, so the caller cannot tell a missing id from a failed read.
    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Self::Entity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipeline = Pipeline::new();
        for id in ids {
            pipeline.hgetall(self.entity_key(id));
        }
        let results = self.store().execute(pipeline).await?;

        let mut entities = Vec::with_capacity(results.len());
        for (id, result) in ids.iter().zip(results) {
            let record = match result {
                Ok(Reply::Hash(record)) if !record.is_empty() => record,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(
                        entity = self.entity_name(),
                        id = %id,
                        error = %e,
                        "Batch read failed"
                    );
                    continue;
                }
            };
            match self.deserialize(record) {
                Ok(entity) => entities.push(entity),
                Err(reason) => {
                    tracing::warn!(
                        entity = self.entity_name(),
                        id = %id,
                        reason = %reason,
                        "Skipping unreadable record"
                    );
                }
            }
        }

        Ok(entities)
    }

    /// Create and persist a new entity.
    ///
    /// Returns the locally built entity without re-reading it. An id that
    /// would collide with the list or an index key is a validation error.
    async fn create(&self, data: Self::Create) -> AppResult<Self::Entity> {
        let entity = self.create_entity(data);
        check_id(entity.id())?;
        let record = self.serialize(&entity);
        let score = Utc::now().timestamp_millis() as f64;

        let mut pipeline = Pipeline::new().atomic();
        pipeline
            .hset_multiple(self.entity_key(entity.id()), &record)
            .zadd(self.list_key(), entity.id(), score);
        self.update_indexes(&mut pipeline, &entity, None);

        let results = self.store().execute(pipeline).await?;
        ensure_applied(&results)?;

        tracing::debug!(entity = self.entity_name(), id = %entity.id(), "Entity created");
        Ok(entity)
    }

    /// Merge `updates` into an existing entity; `None` if the id is unknown.
    async fn update(&self, id: &str, updates: Self::Update) -> AppResult<Option<Self::Entity>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let updated = self.update_entity(&existing, updates);
        let record = self.serialize(&updated);

        let mut pipeline = Pipeline::new().atomic();
        pipeline.hset_multiple(self.entity_key(existing.id()), &record);
        self.update_indexes(&mut pipeline, &updated, Some(&existing));

        let results = self.store().execute(pipeline).await?;
        ensure_applied(&results)?;

        tracing::debug!(entity = self.entity_name(), id = %id, "Entity updated");
        Ok(Some(updated))
    }

    /// Remove the hash, the list entry and every index entry.
    ///
    /// `false` both when the id is unknown and when the hash delete removed
    /// nothing.
    async fn delete(&self, id: &str) -> AppResult<bool> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(false);
        };

        let mut pipeline = Pipeline::new().atomic();
        pipeline
            .del(self.entity_key(existing.id()))
            .zrem(self.list_key(), existing.id());
        self.remove_from_indexes(&mut pipeline, &existing);

        let results = self.store().execute(pipeline).await?;
        ensure_applied(&results)?;

        let removed = results
            .first()
            .and_then(|result| result.as_ref().ok())
            .and_then(Reply::as_int)
            .is_some_and(|count| count >= 1);

        if removed {
            tracing::debug!(entity = self.entity_name(), id = %id, "Entity deleted");
        }
        Ok(removed)
    }

    /// Check the hash key without reading it
    async fn exists(&self, id: &str) -> AppResult<bool> {
        self.store().exists(&self.entity_key(id)).await
    }

    /// Number of entities in the list
    async fn count(&self) -> AppResult<u64> {
        self.store().zcard(&self.list_key()).await
    }

    /// One page of entities, newest first.
    ///
    /// `sort_by` and `sort_order` are ignored: only insertion order is kept
    /// by the list.
    async fn find_paginated(&self, request: &PageRequest) -> AppResult<Page<Self::Entity>> {
        self.paginate_members(&self.list_key(), request).await
    }

    /// One page of the entities whose ids are members of the sorted set at
    /// `set_key`, highest score first.
    async fn paginate_members(
        &self,
        set_key: &str,
        request: &PageRequest,
    ) -> AppResult<Page<Self::Entity>> {
        let limit = request.limit();
        if limit == 0 {
            let total = self.store().zcard(set_key).await?;
            return Ok(Page::new(Vec::new(), request, total));
        }

        let (start, stop) = rank_range(request.offset(), limit);
        let mut pipeline = Pipeline::new();
        pipeline.zcard(set_key).zrevrange(set_key, start, stop);

        let mut results = self.store().execute(pipeline).await?.into_iter();
        let total = expect_reply(results.next(), 0)?
            .as_int()
            .unwrap_or(0)
            .max(0) as u64;
        let ids = expect_reply(results.next(), 1)?
            .into_members()
            .unwrap_or_default();

        let items = self.find_by_ids(&ids).await?;
        Ok(Page::new(items, request, total))
    }
}

/// Fail on the first command of a write batch the store rejected.
pub(crate) fn ensure_applied(results: &[CommandResult]) -> AppResult<()> {
    match results
        .iter()
        .enumerate()
        .find_map(|(index, result)| result.as_ref().err().map(|message| (index, message)))
    {
        Some((index, message)) => Err(AppError::Pipeline {
            index,
            message: message.clone(),
        }),
        None => Ok(()),
    }
}

fn expect_reply(result: Option<CommandResult>, index: usize) -> AppResult<Reply> {
    match result {
        Some(Ok(reply)) => Ok(reply),
        Some(Err(message)) => Err(AppError::Pipeline { index, message }),
        None => Err(AppError::Pipeline {
            index,
            message: "missing reply".to_string(),
        }),
    }
}

/// Inclusive rank bounds of `limit` items starting at `offset`.
fn rank_range(offset: u64, limit: u64) -> (isize, isize) {
    let start = isize::try_from(offset).unwrap_or(isize::MAX);
    let stop = isize::try_from(offset.saturating_add(limit).saturating_sub(1))
        .unwrap_or(isize::MAX);
    (start, stop)
}
