/// Core error taxonomy
///
/// Every service operation fails with a [`CoreError`]. The kinds map one to one
/// onto the failure envelope the HTTP layer renders:
///
/// | Kind           | Condition                                              |
/// |----------------|--------------------------------------------------------|
/// | `NotFound`     | No such row, or the row belongs to another user        |
/// | `AccessDenied` | Task exists but the caller does not own its project    |
/// | `Conflict`     | Duplicate project name per owner, duplicate email      |
/// | `InvalidState` | Past deadline on an active task, project still in use  |
/// | `Validation`   | Field-level problems, reported per field               |
/// | `Unauthorized` | Bad credentials or deactivated account                 |
/// | `Internal`     | Store or driver failure; never shown to clients        |
use serde::{Deserialize, Serialize};

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// A single field-level validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Human-readable message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error type for core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Unauthorized(String),

    /// Store or driver failure. The text is for logs only.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        CoreError::InvalidState(message.into())
    }

    /// Message safe to show to a client
    pub fn public_message(&self) -> String {
        match self {
            CoreError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Short machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::AccessDenied(_) => "access_denied",
            CoreError::Conflict(_) => "conflict",
            CoreError::InvalidState(_) => "invalid_state",
            CoreError::Validation(_) => "validation",
            CoreError::Unauthorized(_) => "unauthorized",
            CoreError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Internal(format!("Database error: {}", err))
    }
}

impl From<crate::auth::password::PasswordError> for CoreError {
    fn from(err: crate::auth::password::PasswordError) -> Self {
        CoreError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<crate::auth::jwt::JwtError> for CoreError {
    fn from(err: crate::auth::jwt::JwtError) -> Self {
        CoreError::Internal(format!("Token operation failed: {}", err))
    }
}
