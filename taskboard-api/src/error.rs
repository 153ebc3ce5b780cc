/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`. Errors render as the failure
/// envelope every client already understands:
///
/// ```json
/// { "success": false, "message": "Project not found" }
/// { "success": false, "message": "Validation failed", "errors": [{"field": "name", "message": "..."}] }
/// ```
///
/// # Status mapping
///
/// | Core kind      | Status |
/// |----------------|--------|
/// | `NotFound`     | 404    |
/// | `AccessDenied` | 403    |
/// | `Conflict`     | 409    |
/// | `InvalidState` | 400    |
/// | `Validation`   | 400    |
/// | `Unauthorized` | 401    |
/// | `Internal`     | 500    |

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use taskboard_shared::envelope::Envelope;
use taskboard_shared::error::{CoreError, FieldError};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Failure reported by the core
    Core(CoreError),

    /// Request couldn't be decoded (malformed JSON, bad query or path) (400)
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::AccessDenied(_) => StatusCode::FORBIDDEN,
                CoreError::Conflict(_) => StatusCode::CONFLICT,
                CoreError::InvalidState(_) | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Core(err) => write!(f, "{}", err),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let core = match self {
            ApiError::Core(err) => err,
            ApiError::BadRequest(msg) => CoreError::InvalidState(msg),
        };

        match &core {
            // Log internal errors but don't expose details to clients
            CoreError::Internal(detail) => tracing::error!(error = %detail, "Internal error"),
            other => tracing::debug!(kind = other.kind(), message = %other, "Request failed"),
        }

        (status, Json(Envelope::failure(&core))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Convert field validation failures to the core's per-field form
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Core(CoreError::Validation(field_errors(&errors)))
    }
}

/// Flattens validator output into field errors, sorted by field name
pub fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let field = camel_case(field);
            errors.iter().map(move |error| {
                FieldError::new(
                    field.clone(),
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field)),
                )
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

/// `end_date` -> `endDate`, matching the request body's field names
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
        name: String,
        #[validate(range(min = 0.0))]
        estimated_hours: f64,
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::AccessDenied("x".into()), StatusCode::FORBIDDEN),
            (CoreError::Conflict("x".into()), StatusCode::CONFLICT),
            (CoreError::InvalidState("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::Validation(vec![]), StatusCode::BAD_REQUEST),
            (CoreError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (CoreError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(
            ApiError::BadRequest("bad json".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_validation_errors_use_request_field_names() {
        let sample = Sample {
            name: "x".to_string(),
            estimated_hours: -1.0,
        };
        let err = ApiError::from(sample.validate().unwrap_err());

        let ApiError::Core(CoreError::Validation(fields)) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "estimatedHours");
        assert_eq!(fields[0].message, "Invalid value for estimatedHours");
        assert_eq!(fields[1].field, "name");
        assert_eq!(fields[1].message, "Name must be at least 2 characters");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("end_date"), "endDate");
        assert_eq!(camel_case("name"), "name");
        assert_eq!(camel_case("current_password"), "currentPassword");
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::from(CoreError::NotFound("Task not found".to_string()));
        assert_eq!(err.to_string(), "Task not found");
    }
}
