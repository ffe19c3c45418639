//! Centralized error handling.
//!
//! Provides a unified error type for the store, repository and service
//! layers. Store failures always propagate; "not found" is expressed by
//! repositories as `Ok(None)` / `Ok(false)` and only becomes
//! [`AppError::NotFound`] at the service layer.

use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    // Key-value store errors
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Pipeline command {index} failed: {message}")]
    Pipeline { index: usize, message: String },

    #[error("Corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    // Internal
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Store(_) => "STORE_ERROR",
            AppError::Pipeline { .. } => "PIPELINE_ERROR",
            AppError::Corrupt { .. } => "CORRUPT_RECORD",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller caused the error (as opposed to the store or a bug)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound
                | AppError::Conflict(_)
                | AppError::Validation(_)
        )
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),
            AppError::Conflict(msg) => format!("{} already exists", msg),

            // Hide details for store/internal errors
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                "A storage error occurred".to_string()
            }
            AppError::Pipeline { index, message } => {
                tracing::error!(index, "Pipeline error: {}", message);
                "A storage error occurred".to_string()
            }
            AppError::Corrupt { key, reason } => {
                tracing::error!(key = %key, "Corrupt record: {}", reason);
                "A storage error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            AppError::NotFound => self.to_string(),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
