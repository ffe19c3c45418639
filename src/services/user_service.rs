//! User service - Handles user-related business logic.
//!
//! Requests are validated here before any store access. Email uniqueness is
//! enforced by the repository, which claims the email index atomically and
//! returns `Conflict`; the lookup done here only rejects the common case
//! without attempting a write.

use async_trait::async_trait;
use std::sync::Arc;
use validator::Validate;

use crate::domain::{RegisterUser, User, UserChanges};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UserRepository;
use crate::types::{Page, PageRequest};

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Validate and create a user; `Conflict` if the email is taken
    async fn register(&self, request: RegisterUser) -> AppResult<User>;

    /// Get user by ID
    async fn get_user(&self, id: &str) -> AppResult<User>;

    /// Get user by email (case-insensitive)
    async fn get_user_by_email(&self, email: &str) -> AppResult<User>;

    /// One page of users, newest first
    async fn list_users(&self, request: &PageRequest) -> AppResult<Page<User>>;

    /// Update user details; `Conflict` if the new email belongs to someone else
    async fn update_user(&self, id: &str, changes: UserChanges) -> AppResult<User>;

    /// Mark the user inactive, keeping the record
    async fn deactivate_user(&self, id: &str) -> AppResult<User>;

    /// Permanently delete the user and its index entries
    async fn delete_user(&self, id: &str) -> AppResult<()>;
}

/// Concrete implementation of UserService using repository.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
}

impl UserManager {
    /// Create new user service instance with repository
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn register(&self, mut request: RegisterUser) -> AppResult<User> {
        request.email = request.email.trim().to_string();
        request
            .validate()
            .map_err(|e| AppError::validation(format_validation_errors(&e)))?;

        if self.repo.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::conflict("Email"));
        }

        let user = self.repo.create(request.into()).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> AppResult<User> {
        self.repo.find_by_id(id).await?.ok_or_not_found()
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<User> {
        self.repo.find_by_email(email).await?.ok_or_not_found()
    }

    async fn list_users(&self, request: &PageRequest) -> AppResult<Page<User>> {
        self.repo.list(request).await
    }

    async fn update_user(&self, id: &str, mut changes: UserChanges) -> AppResult<User> {
        if changes.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }
        changes.email = changes.email.map(|email| email.trim().to_string());
        changes
            .validate()
            .map_err(|e| AppError::validation(format_validation_errors(&e)))?;

        if let Some(email) = &changes.email {
            if let Some(owner) = self.repo.find_by_email(email).await? {
                if owner.id != id {
                    return Err(AppError::conflict("Email"));
                }
            }
        }

        self.repo.update(id, changes).await?.ok_or_not_found()
    }

    async fn deactivate_user(&self, id: &str) -> AppResult<User> {
        let changes = UserChanges {
            is_active: Some(false),
            ..UserChanges::default()
        };
        let user = self.repo.update(id, changes).await?.ok_or_not_found()?;
        tracing::info!(user_id = %user.id, "User deactivated");
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> AppResult<()> {
        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}

/// Collect validation messages into one sorted, comma-separated string
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MockUserRepository;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn create_test_user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            email: email.to_string(),
            password_hash: "hashed".to_string(),
            name: "Test User".to_string(),
            is_active: true,
            profile_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn register_request(email: &str) -> RegisterUser {
        RegisterUser {
            email: email.to_string(),
            password_hash: "hashed".to_string(),
            name: "Test User".to_string(),
            profile_image: None,
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .with(eq("new@example.com"))
            .returning(|_| Ok(None));
        repo.expect_create()
            .times(1)
            .returning(|data| Ok(create_test_user("usr_1", &data.email)));

        let service = UserManager::new(Arc::new(repo));
        let user = service
            .register(register_request(" new@example.com "))
            .await
            .unwrap();

        assert_eq!(user.id, "usr_1");
        assert_eq!(user.email, "new@example.com");
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(Some(create_test_user("usr_1", "a@x.com"))));
        repo.expect_create().never();

        let service = UserManager::new(Arc::new(repo));
        let result = service.register(register_request("A@X.com")).await;

        assert!(matches!(result, Err(AppError::Conflict(entity)) if entity == "Email"));
    }

    #[tokio::test]
    async fn test_register_invalid_email_skips_store() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().never();
        repo.expect_create().never();

        let service = UserManager::new(Arc::new(repo));
        let result = service.register(register_request("not-an-email")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let service = UserManager::new(Arc::new(repo));
        let result = service.get_user("usr_missing").await;

        assert!(matches!(result.unwrap_err(), AppError::NotFound));
    }

    #[tokio::test]
    async fn test_update_user_rejects_foreign_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(Some(create_test_user("usr_2", "b@x.com"))));
        repo.expect_update().never();

        let service = UserManager::new(Arc::new(repo));
        let changes = UserChanges {
            email: Some("b@x.com".to_string()),
            ..UserChanges::default()
        };
        let result = service.update_user("usr_1", changes).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_user_allows_own_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(Some(create_test_user("usr_1", "a@x.com"))));
        repo.expect_update()
            .returning(|id, changes| {
                Ok(Some(create_test_user(id, &changes.email.unwrap_or_default())))
            });

        let service = UserManager::new(Arc::new(repo));
        let changes = UserChanges {
            email: Some("A@x.com".to_string()),
            ..UserChanges::default()
        };
        let user = service.update_user("usr_1", changes).await.unwrap();

        assert_eq!(user.email, "A@x.com");
    }

    #[tokio::test]
    async fn test_update_user_rejects_invalid_email_before_lookup() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().never();
        repo.expect_update().never();

        let service = UserManager::new(Arc::new(repo));
        for email in ["", "   ", "not-an-email"] {
            let changes = UserChanges {
                email: Some(email.to_string()),
                ..UserChanges::default()
            };
            let result = service.update_user("usr_1", changes).await;
            assert!(
                matches!(&result, Err(AppError::Validation(msg)) if msg == "Invalid email address"),
                "{:?}",
                result
            );
        }
    }

    #[tokio::test]
    async fn test_update_user_rejects_empty_name() {
        let mut repo = MockUserRepository::new();
        repo.expect_update().never();

        let service = UserManager::new(Arc::new(repo));
        let changes = UserChanges {
            name: Some(String::new()),
            ..UserChanges::default()
        };
        let result = service.update_user("usr_1", changes).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_user_requires_changes() {
        let repo = MockUserRepository::new();
        let service = UserManager::new(Arc::new(repo));

        let result = service.update_user("usr_1", UserChanges::default()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_deactivate_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_update()
            .withf(|id, changes| id == "usr_1" && changes.is_active == Some(false))
            .returning(|id, _| {
                let mut user = create_test_user(id, "a@x.com");
                user.is_active = false;
                Ok(Some(user))
            });

        let service = UserManager::new(Arc::new(repo));
        let user = service.deactivate_user("usr_1").await.unwrap();

        assert!(!user.is_active());
    }

    #[tokio::test]
    async fn test_delete_user_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_delete().returning(|_| Ok(false));

        let service = UserManager::new(Arc::new(repo));
        let result = service.delete_user("usr_missing").await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_users_passes_request() {
        let mut repo = MockUserRepository::new();
        repo.expect_list()
            .withf(|request| request.page() == 2 && request.limit() == 5)
            .returning(|request| {
                Ok(Page::new(
                    vec![create_test_user("usr_1", "a@x.com")],
                    request,
                    6,
                ))
            });

        let service = UserManager::new(Arc::new(repo));
        let page = service.list_users(&PageRequest::new(2, 5)).await.unwrap();

        assert_eq!(page.total, 6);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_format_validation_errors() {
        let errors = register_request("nope").validate().unwrap_err();
        assert_eq!(format_validation_errors(&errors), "Invalid email address");
    }
}
