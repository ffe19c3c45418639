//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Entity;

/// User domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Email in the form used for lookups and the unique index
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    /// Check if user is active
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Entity for User {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Lower-cased, trimmed email. Two emails are the same account iff their
/// normalized forms are equal.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Data for a new user record (password already hashed)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    /// Caller-chosen id; generated when absent
    pub id: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    /// Defaults to active
    pub is_active: Option<bool>,
    pub profile_image: Option<String>,
}

/// Partial update of a user.
///
/// `id` and `created_at` cannot be expressed here; they are fixed at creation.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UserChanges {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Password hash is required"))]
    pub password_hash: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
    /// `Some(None)` clears the image
    pub profile_image: Option<Option<String>>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password_hash.is_none()
            && self.name.is_none()
            && self.is_active.is_none()
            && self.profile_image.is_none()
    }
}

/// Registration request, validated before anything is written
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password hash is required"))]
    pub password_hash: String,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    pub profile_image: Option<String>,
}

impl From<RegisterUser> for NewUser {
    fn from(request: RegisterUser) -> Self {
        Self {
            id: None,
            email: request.email,
            password_hash: request.password_hash,
            name: request.name,
            is_active: None,
            profile_image: request.profile_image,
        }
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_active: user.is_active,
            profile_image: user.profile_image,
            created_at: user.created_at,
        }
    }
}
