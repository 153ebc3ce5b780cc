//! The uniform response envelope.
//!
//! Every service operation yields `CoreResult<Envelope<T>>`: the `Ok` side is a
//! success envelope, the `Err` side a [`CoreError`] that the HTTP layer turns into
//! a failure envelope with [`Envelope::failure`]. Serialized shape:
//!
//! ```json
//! { "success": true, "data": {...}, "message": "...", "pagination": {...} }
//! { "success": false, "message": "...", "errors": [{"field": "...", "message": "..."}] }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, FieldError};
use crate::models::query::PageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let limit = i64::from(request.limit.max(1));
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T> Envelope<T> {
    /// Success envelope carrying data
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            pagination: None,
            errors: None,
        }
    }

    /// Success envelope for a page of results
    pub fn paginated(data: T, message: impl Into<String>, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data, message)
        }
    }

    /// Success envelope with no data (deletes, logout)
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: message.into(),
            pagination: None,
            errors: None,
        }
    }

    /// Maps the data payload, keeping message and pagination
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            pagination: self.pagination,
            errors: self.errors,
        }
    }
}

impl Envelope<()> {
    /// Failure envelope for a core error. Internal details are never included.
    pub fn failure(err: &CoreError) -> Self {
        let errors = match err {
            CoreError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };

        Self {
            success: false,
            data: None,
            message: err.public_message(),
            pagination: None,
            errors,
        }
    }
}
