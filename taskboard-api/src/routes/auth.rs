/// Authentication endpoints
///
/// This module provides account endpoints:
/// - Registration and login (public)
/// - Current user, profile, password change, logout and deactivation
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register new user
/// - `POST /api/auth/login` - Login and get a token
/// - `GET  /api/auth/me` - Current user
/// - `PUT  /api/auth/profile` - Update name, email or avatar
/// - `PUT  /api/auth/change-password` - Change password
/// - `POST /api/auth/logout` - Acknowledge logout
/// - `PUT  /api/auth/deactivate` - Deactivate the account

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{created, ok, validate_request, ExtraRules},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    envelope::Envelope,
    models::{UpdateUser, User},
    services::account::{AuthSession, Credentials, PasswordChange, Registration},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

impl ExtraRules for RegisterRequest {}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl ExtraRules for LoginRequest {}

/// Profile update request; absent fields stay unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,

    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar: Option<String>,
}

impl ExtraRules for ProfileRequest {}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 6, message = "New password must be at least 6 characters long"))]
    pub new_password: String,
}

impl ExtraRules for ChangePasswordRequest {}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// { "name": "Ada", "email": "ada@example.com", "password": "secret1" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<AuthSession>>)> {
    let Json(req) = body?;
    validate_request(&req)?;

    let envelope = state
        .services
        .accounts
        .register(Registration {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(created(envelope))
}

/// Login with email and password
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Wrong credentials or deactivated account
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<AuthSession>>> {
    let Json(req) = body?;
    validate_request(&req)?;

    let envelope = state
        .services
        .accounts
        .login(Credentials {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(ok(envelope))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<User>>> {
    Ok(ok(state.services.accounts.current_user(auth.user_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<ProfileRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<User>>> {
    let Json(req) = body?;
    validate_request(&req)?;

    let changes = UpdateUser {
        name: req.name,
        email: req.email,
        avatar: req.avatar,
    };
    Ok(ok(state.services.accounts.update_profile(auth.user_id, changes).await?))
}

/// Change password
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or current password is wrong
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<User>>> {
    let Json(req) = body?;
    validate_request(&req)?;

    let change = PasswordChange {
        current_password: req.current_password,
        new_password: req.new_password,
    };
    Ok(ok(state.services.accounts.change_password(auth.user_id, change).await?))
}

/// Tokens are stateless, so this only acknowledges the logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Json<Envelope<()>> {
    ok(state.services.accounts.logout(auth.user_id))
}

pub async fn deactivate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<()>>> {
    Ok(ok(state.services.accounts.deactivate_account(auth.user_id).await?))
}
