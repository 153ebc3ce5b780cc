/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and profile endpoints
/// - `projects`: Project CRUD, listings and statistics
/// - `tasks`: Task CRUD, status changes, kanban board and statistics
/// - `dashboard`: Aggregated dashboard statistics
///
/// Handlers decode and validate the request, call one service and return its
/// envelope unchanged.

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod projects;
pub mod tasks;

use axum::{
    extract::{rejection::PathRejection, Path},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use taskboard_shared::envelope::Envelope;
use taskboard_shared::error::{CoreError, FieldError};
use validator::Validate;

use crate::error::{field_errors, ApiError, ApiResult};

/// Success response with status 200
pub(crate) fn ok<T: Serialize>(envelope: Envelope<T>) -> Json<Envelope<T>> {
    Json(envelope)
}

/// Success response with status 201
pub(crate) fn created<T: Serialize>(envelope: Envelope<T>) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, Json(envelope))
}

/// Unwraps an id path segment; anything but a UUID is a 400
pub(crate) fn path_id(path: Result<Path<Uuid>, PathRejection>) -> ApiResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("Invalid ID format".to_string()))
}

/// Rules `validator` derives can't express
pub(crate) trait ExtraRules {
    fn extra_errors(&self) -> Vec<FieldError> {
        Vec::new()
    }
}

/// Runs derived and extra rules, reporting every failing field at once
pub(crate) fn validate_request<T: Validate + ExtraRules>(request: &T) -> ApiResult<()> {
    let mut errors = match request.validate() {
        Ok(()) => Vec::new(),
        Err(e) => field_errors(&e),
    };
    errors.extend(request.extra_errors());

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Core(CoreError::Validation(errors)))
    }
}

/// `#RGB` or `#RRGGBB`
pub(crate) fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Each tag must be 1 to 50 characters once trimmed
pub(crate) fn tag_errors(tags: Option<&[String]>) -> Vec<FieldError> {
    let bad = tags
        .unwrap_or_default()
        .iter()
        .any(|t| t.trim().is_empty() || t.trim().chars().count() > 50);
    if bad {
        vec![FieldError::new("tags", "Each tag must be between 1 and 50 characters")]
    } else {
        Vec::new()
    }
}
