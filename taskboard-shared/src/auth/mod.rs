/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: HS256 access tokens carrying the user id
/// - [`middleware`]: Bearer authentication for axum routers
/// - [`authorization`]: The ownership guard every project and task operation passes through
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::password::{hash_password, verify_password};
/// use taskboard_shared::auth::jwt::TokenIssuer;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let issuer = TokenIssuer::new("a-secret-of-at-least-thirty-two-bytes", chrono::Duration::days(7));
/// let token = issuer.issue(Uuid::new_v4())?;
/// let claims = issuer.verify(&token)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
