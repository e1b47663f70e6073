//! Identifier + password verification.

use tracing::debug;

use super::AuthError;
use super::password::PasswordHasher;
use crate::models::auth::{Principal, ProofTransport};
use crate::store::UserStore;

/// Verify an email-or-mobile identifier and password.
///
/// Unknown identifiers, accounts without a local password and wrong
/// passwords all fail with [`AuthError::InvalidCredentials`]. Read-only.
pub async fn verify_credentials(
    users: &dyn UserStore,
    hasher: &PasswordHasher,
    identifier: &str,
    password: &str,
) -> Result<Principal, AuthError> {
    let identifier = identifier.trim();
    if identifier.is_empty() || password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }

    let Some(user) = users.find_user_by_identifier(identifier).await? else {
        debug!("login for unknown identifier");
        return Err(AuthError::InvalidCredentials);
    };
    let Some(hash) = user.password_hash.as_deref() else {
        debug!(user_id = %user.id, "login for password-less account");
        return Err(AuthError::InvalidCredentials);
    };

    if !hasher.verify(password, hash).await? {
        debug!(user_id = %user.id, "password mismatch");
        return Err(AuthError::InvalidCredentials);
    }

    Ok(Principal::from_user(&user, ProofTransport::Password))
}
