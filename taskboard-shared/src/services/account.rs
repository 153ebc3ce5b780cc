/// Account use cases: registration, login and profile management
///
/// Emails are compared in normalized form (trimmed, lowercased). Tokens are
/// stateless; logging out is an acknowledgement only.
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::jwt::TokenIssuer;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::envelope::Envelope;
use crate::error::{CoreError, CoreResult, FieldError};
use crate::models::{NewUser, UpdateUser, User};
use crate::store::Stores;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const ACCOUNT_DEACTIVATED: &str = "Account has been deactivated";
pub const USER_NOT_FOUND: &str = "User not found";
pub const WRONG_CURRENT_PASSWORD: &str = "Current password is incorrect";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// A user together with a freshly issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    stores: Stores,
    tokens: TokenIssuer,
}

fn weak_password(field: &str, message: String) -> CoreError {
    CoreError::Validation(vec![FieldError::new(field, message)])
}

impl AccountService {
    pub fn new(stores: Stores, tokens: TokenIssuer) -> Self {
        Self { stores, tokens }
    }

    /// Creates an account and signs it in
    ///
    /// The unique email constraint decides duplicates, not a prior lookup.
    pub async fn register(&self, input: Registration) -> CoreResult<Envelope<AuthSession>> {
        validate_password_strength(&input.password)
            .map_err(|m| weak_password("password", m))?;

        let password_hash = hash_password(&input.password)?;
        let user = self
            .stores
            .users
            .insert_user(NewUser {
                name: input.name.trim().to_string(),
                email: User::normalize_email(&input.email),
                password_hash,
            })
            .await?;
        info!(user_id = %user.id, "User registered");

        let token = self.tokens.issue(user.id)?;
        Ok(Envelope::ok(
            AuthSession { user, token },
            "User registered successfully",
        ))
    }

    /// Verifies credentials and issues a token
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, input: Credentials) -> CoreResult<Envelope<AuthSession>> {
        let email = User::normalize_email(&input.email);
        let user = self
            .stores
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| CoreError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !user.active {
            warn!(user_id = %user.id, "Login to deactivated account");
            return Err(CoreError::Unauthorized(ACCOUNT_DEACTIVATED.to_string()));
        }

        if !verify_password(&input.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.stores.users.record_login(user.id).await?;
        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "User logged in");

        Ok(Envelope::ok(AuthSession { user, token }, "Login successful"))
    }

    pub async fn current_user(&self, user_id: Uuid) -> CoreResult<Envelope<User>> {
        let user = self.user(user_id).await?;
        Ok(Envelope::ok(user, "User retrieved successfully"))
    }

    /// Updates name, email or avatar; a taken email is a `Conflict`
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        mut changes: UpdateUser,
    ) -> CoreResult<Envelope<User>> {
        changes.name = changes.name.map(|n| n.trim().to_string());
        changes.email = changes.email.as_deref().map(User::normalize_email);

        let user = self
            .stores
            .users
            .update_user(user_id, changes)
            .await?
            .ok_or_else(|| CoreError::not_found(USER_NOT_FOUND))?;
        info!(%user_id, "Profile updated");

        Ok(Envelope::ok(user, "Profile updated successfully"))
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        input: PasswordChange,
    ) -> CoreResult<Envelope<User>> {
        let user = self.user(user_id).await?;

        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(CoreError::invalid_state(WRONG_CURRENT_PASSWORD));
        }
        validate_password_strength(&input.new_password)
            .map_err(|m| weak_password("newPassword", m))?;

        let password_hash = hash_password(&input.new_password)?;
        if !self.stores.users.set_password(user_id, &password_hash).await? {
            return Err(CoreError::not_found(USER_NOT_FOUND));
        }
        info!(%user_id, "Password changed");

        let user = self.user(user_id).await?;
        Ok(Envelope::ok(user, "Password changed successfully"))
    }

    /// Soft-disables the account; it can no longer log in or authenticate
    pub async fn deactivate_account(&self, user_id: Uuid) -> CoreResult<Envelope<()>> {
        if !self.stores.users.set_active(user_id, false).await? {
            return Err(CoreError::not_found(USER_NOT_FOUND));
        }
        info!(%user_id, "Account deactivated");

        Ok(Envelope::message_only("Account deactivated successfully"))
    }

    pub fn logout(&self, user_id: Uuid) -> Envelope<()> {
        info!(%user_id, "User logged out");
        Envelope::message_only("Logged out successfully")
    }

    async fn user(&self, user_id: Uuid) -> CoreResult<User> {
        self.stores
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found(USER_NOT_FOUND))
    }
}
