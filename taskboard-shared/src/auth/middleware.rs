/// Bearer authentication for Axum
///
/// Validates the `Authorization: Bearer <token>` header, loads the user the
/// token names and rejects missing or deactivated accounts. On success an
/// [`AuthContext`] is added to the request extensions.
///
/// Rejections are rendered as the standard failure envelope with status 401.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use taskboard_shared::auth::middleware::{require_auth, AuthContext, Authenticator};
///
/// async fn me(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.name)
/// }
///
/// fn protected(authenticator: Authenticator) -> Router {
///     Router::new()
///         .route("/me", get(me))
///         .layer(middleware::from_fn_with_state(authenticator, require_auth))
/// }
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{JwtError, TokenIssuer};
use crate::envelope::Envelope;
use crate::error::CoreError;
use crate::models::User;
use crate::store::UserStore;

pub const NO_TOKEN: &str = "Not authorized, no token provided";
pub const INVALID_TOKEN: &str = "Invalid or expired token";
pub const USER_NOT_FOUND: &str = "User not found";
pub const ACCOUNT_DEACTIVATED: &str = "Account has been deactivated";

/// Identity of the caller, added to request extensions
///
/// ```
/// use axum::Extension;
/// use taskboard_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing or non-Bearer authorization header
    MissingCredentials,

    /// Bad signature, wrong issuer or expired
    InvalidToken,

    /// Token names a user that no longer exists
    UnknownUser,

    Deactivated,

    /// Store failure while loading the user
    Store(CoreError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn into_core(self) -> CoreError {
        match self {
            AuthError::MissingCredentials => CoreError::Unauthorized(NO_TOKEN.to_string()),
            AuthError::InvalidToken => CoreError::Unauthorized(INVALID_TOKEN.to_string()),
            AuthError::UnknownUser => CoreError::Unauthorized(USER_NOT_FOUND.to_string()),
            AuthError::Deactivated => CoreError::Unauthorized(ACCOUNT_DEACTIVATED.to_string()),
            AuthError::Store(err) => err,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let err = self.into_core();
        if let CoreError::Internal(detail) = &err {
            tracing::error!(error = %detail, "Authentication lookup failed");
        }
        (status, Json(Envelope::failure(&err))).into_response()
    }
}

/// Resolves bearer tokens to active users
#[derive(Clone)]
pub struct Authenticator {
    tokens: TokenIssuer,
    users: Arc<dyn UserStore>,
}

impl Authenticator {
    pub fn new(tokens: TokenIssuer, users: Arc<dyn UserStore>) -> Self {
        Self { tokens, users }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Authenticates the request headers
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` without a `Bearer` authorization header
    /// - `InvalidToken` when the token fails validation
    /// - `UnknownUser` / `Deactivated` when the account can't be used
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        let claims = self.tokens.verify(token).map_err(|e| {
            match e {
                JwtError::Expired => tracing::debug!("Rejected expired token"),
                other => tracing::debug!(error = %other, "Rejected token"),
            }
            AuthError::InvalidToken
        })?;

        let user = self
            .users
            .find_user(claims.sub)
            .await
            .map_err(AuthError::Store)?
            .ok_or(AuthError::UnknownUser)?;

        if !user.active {
            return Err(AuthError::Deactivated);
        }

        Ok(AuthContext::from(&user))
    }
}

/// Middleware rejecting unauthenticated requests
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn require_auth(
    State(authenticator): State<Authenticator>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = authenticator.authenticate(req.headers()).await?;
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::memory::MemoryStore;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "middleware-test-secret-at-least-32-bytes";

    async fn setup() -> (Authenticator, Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let authenticator =
            Authenticator::new(TokenIssuer::new(SECRET, Duration::hours(1)), store.clone());
        (authenticator, store, user)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_valid_token() {
        let (authenticator, _, user) = setup().await;
        let token = authenticator.tokens().issue(user.id).unwrap();

        let context = authenticator.authenticate(&bearer(&token)).await.unwrap();
        assert_eq!(context.user_id, user.id);
        assert_eq!(context.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_missing_and_malformed_header() {
        let (authenticator, _, _) = setup().await;

        let err = authenticator.authenticate(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        let err = authenticator.authenticate(&headers).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let (authenticator, _, _) = setup().await;
        let err = authenticator
            .authenticate(&bearer("invalid-token"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_unknown_and_deactivated_users() {
        let (authenticator, store, user) = setup().await;

        let stranger = authenticator.tokens().issue(Uuid::new_v4()).unwrap();
        let err = authenticator.authenticate(&bearer(&stranger)).await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownUser));

        store.set_active(user.id, false).await.unwrap();
        let token = authenticator.tokens().issue(user.id).unwrap();
        let err = authenticator.authenticate(&bearer(&token)).await.unwrap_err();
        assert!(matches!(err, AuthError::Deactivated));
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::Deactivated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::Store(CoreError::Internal("boom".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
