//! User repository with a unique, case-insensitive email index.

use std::sync::Arc;

use async_trait::async_trait;

use super::base::RedisRepository;
use super::record::RecordExt;
use crate::config::{EMAIL_CLAIM_TTL_SECONDS, ENTITY_USER, ID_PREFIX_USER, INDEX_FIELD_EMAIL};
use crate::domain::{normalize_email, NewUser, User, UserChanges};
use crate::errors::{AppError, AppResult};
use crate::infra::keys::{check_id, KeySpace};
use crate::infra::store::{KeyValueStore, Pipeline, Record};
use crate::types::{Page, PageRequest};
use crate::utils::generate_id;
use crate::utils::serialization::{
    now, serialize_boolean, serialize_date, serialize_optional_string,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const FIELD_ID: &str = "id";
const FIELD_EMAIL: &str = "email";
const FIELD_PASSWORD_HASH: &str = "passwordHash";
const FIELD_NAME: &str = "name";
const FIELD_IS_ACTIVE: &str = "isActive";
const FIELD_PROFILE_IMAGE: &str = "profileImage";
const FIELD_CREATED_AT: &str = "createdAt";
const FIELD_UPDATED_AT: &str = "updatedAt";

/// User repository trait for dependency injection.
///
/// Not-found is `Ok(None)` / `Ok(false)`; store failures are errors.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;

    /// Find user by email address (case-insensitive)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Check whether an email index entry exists, without reading the user
    async fn email_exists(&self, email: &str) -> AppResult<bool>;

    /// Create a new user
    async fn create(&self, data: NewUser) -> AppResult<User>;

    /// Update user fields; `None` if the user does not exist
    async fn update(&self, id: &str, changes: UserChanges) -> AppResult<Option<User>>;

    /// Delete user by ID; `false` if nothing was deleted
    async fn delete(&self, id: &str) -> AppResult<bool>;

    /// One page of users, newest first
    async fn list(&self, request: &PageRequest) -> AppResult<Page<User>>;
}

/// Redis-backed user repository
pub struct UserStore {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    fn email_key(&self, email: &str) -> String {
        self.index_key(INDEX_FIELD_EMAIL, &normalize_email(email))
    }

    /// Point the email index at `id` unless another user already holds it.
    ///
    /// A fresh claim expires after [`EMAIL_CLAIM_TTL_SECONDS`] unless the
    /// user write that follows commits it. A committed entry whose owner is
    /// gone, or no longer has this address, is taken over.
    ///
    /// Returns whether this call created the entry; `false` means `id`
    /// already owned it.
    async fn claim_email(&self, email: &str, id: &str) -> AppResult<bool> {
        let email_key = self.email_key(email);
        let ttl = Some(EMAIL_CLAIM_TTL_SECONDS);
        if self.store.set_nx(&email_key, id, ttl).await? {
            return Ok(true);
        }

        let owner = match self.store.get(&email_key).await? {
            Some(owner) if owner == id => return Ok(false),
            Some(owner) => owner,
            None => return Err(AppError::conflict("Email")),
        };

        if !self.is_stale_owner(&email_key, &owner, email).await? {
            return Err(AppError::conflict("Email"));
        }
        if !self.store.compare_and_set(&email_key, &owner, id, ttl).await? {
            return Err(AppError::conflict("Email"));
        }
        tracing::warn!(
            email = %email,
            stale_owner = %owner,
            id = %id,
            "Took over stale email index entry"
        );
        Ok(true)
    }

    /// Whether a committed index entry points at a user that does not hold
    /// the address. Entries still carrying a claim expiry are in flight.
    async fn is_stale_owner(&self, email_key: &str, owner: &str, email: &str) -> AppResult<bool> {
        if self.store.ttl(email_key).await? != -1 {
            return Ok(false);
        }
        let holder = RedisRepository::find_by_id(self, owner).await?;
        Ok(!holder.is_some_and(|user| user.normalized_email() == normalize_email(email)))
    }

    /// Drop a claim whose write did not go through.
    async fn release_email(&self, email_key: &str) {
        if let Err(e) = self.store.del(email_key).await {
            tracing::warn!(key = %email_key, error = %e, "Failed to release email claim");
        }
    }
}

impl RedisRepository for UserStore {
    type Entity = User;
    type Create = NewUser;
    type Update = UserChanges;

    fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    fn keys(&self) -> &KeySpace {
        &self.keys
    }

    fn entity_name(&self) -> &'static str {
        ENTITY_USER
    }

    fn serialize(&self, user: &User) -> Record {
        [
            (FIELD_ID, user.id.clone()),
            (FIELD_EMAIL, user.email.clone()),
            (FIELD_PASSWORD_HASH, user.password_hash.clone()),
            (FIELD_NAME, user.name.clone()),
            (FIELD_IS_ACTIVE, serialize_boolean(user.is_active)),
            (
                FIELD_PROFILE_IMAGE,
                serialize_optional_string(user.profile_image.as_deref()),
            ),
            (FIELD_CREATED_AT, serialize_date(&user.created_at)),
            (FIELD_UPDATED_AT, serialize_date(&user.updated_at)),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
    }

    fn deserialize(&self, record: Record) -> Result<User, String> {
        Ok(User {
            id: record.required(FIELD_ID)?,
            email: record.required(FIELD_EMAIL)?,
            password_hash: record.required(FIELD_PASSWORD_HASH)?,
            name: record.optional(FIELD_NAME).unwrap_or_default(),
            is_active: record.flag(FIELD_IS_ACTIVE),
            profile_image: record.optional(FIELD_PROFILE_IMAGE),
            created_at: record.required_date(FIELD_CREATED_AT)?,
            updated_at: record.required_date(FIELD_UPDATED_AT)?,
        })
    }

    fn create_entity(&self, data: NewUser) -> User {
        let timestamp = now();
        User {
            id: data
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| generate_id(Some(ID_PREFIX_USER))),
            email: data.email.trim().to_string(),
            password_hash: data.password_hash,
            name: data.name,
            is_active: data.is_active.unwrap_or(true),
            profile_image: data.profile_image.filter(|image| !image.is_empty()),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    fn update_entity(&self, existing: &User, changes: UserChanges) -> User {
        User {
            id: existing.id.clone(),
            email: changes
                .email
                .map(|email| email.trim().to_string())
                .unwrap_or_else(|| existing.email.clone()),
            password_hash: changes
                .password_hash
                .unwrap_or_else(|| existing.password_hash.clone()),
            name: changes.name.unwrap_or_else(|| existing.name.clone()),
            is_active: changes.is_active.unwrap_or(existing.is_active),
            profile_image: match changes.profile_image {
                Some(image) => image.filter(|image| !image.is_empty()),
                None => existing.profile_image.clone(),
            },
            created_at: existing.created_at,
            updated_at: now(),
        }
    }

    fn update_indexes(&self, pipeline: &mut Pipeline, user: &User, previous: Option<&User>) {
        if let Some(previous) = previous {
            if previous.normalized_email() != user.normalized_email() {
                pipeline.del(self.email_key(&previous.email));
            }
        }
        pipeline.set(self.email_key(&user.email), user.id.clone(), None);
    }

    fn remove_from_indexes(&self, pipeline: &mut Pipeline, user: &User) {
        pipeline.del(self.email_key(&user.email));
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        RedisRepository::find_by_id(self, id).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let Some(id) = self.store.get(&self.email_key(email)).await? else {
            return Ok(None);
        };

        let user = RedisRepository::find_by_id(self, &id).await?;
        match user {
            Some(user) if user.normalized_email() == normalize_email(email) => Ok(Some(user)),
            _ => {
                tracing::warn!(email = %email, id = %id, "Stale email index entry");
                Ok(None)
            }
        }
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        self.store.exists(&self.email_key(email)).await
    }

    async fn create(&self, mut data: NewUser) -> AppResult<User> {
        let id = data
            .id
            .take()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| generate_id(Some(ID_PREFIX_USER)));
        check_id(&id)?;
        let email_key = self.email_key(&data.email);
        let claimed = self.claim_email(&data.email, &id).await?;

        data.id = Some(id);
        let result = RedisRepository::create(self, data).await;
        if claimed && result.is_err() {
            self.release_email(&email_key).await;
        }
        result
    }

    async fn update(&self, id: &str, changes: UserChanges) -> AppResult<Option<User>> {
        // Claim a new address before writing so two users cannot race for it
        let mut claimed = None;
        if let Some(email) = &changes.email {
            if self.claim_email(email, id).await? {
                claimed = Some(self.email_key(email));
            }
        }

        let result = RedisRepository::update(self, id, changes).await;
        if let (Ok(None) | Err(_), Some(email_key)) = (&result, &claimed) {
            self.release_email(email_key).await;
        }
        result
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        RedisRepository::delete(self, id).await
    }

    async fn list(&self, request: &PageRequest) -> AppResult<Page<User>> {
        RedisRepository::find_paginated(self, request).await
    }
}
