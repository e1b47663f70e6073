//! Authentication: credential verification, token issuance and session
//! resolution.
//!
//! Everything here classifies failures as [`AuthError`] and never formats a
//! response; the HTTP layer owns the mapping to status codes.

pub mod config;
pub mod credentials;
pub mod federated;
pub mod jwt;
pub mod password;
pub mod resolver;
pub mod session;
pub mod signup;

use thiserror::Error;

use crate::store::StoreError;

/// Minimum length of a locally set password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown identifier, password-less account, or wrong password. The
    /// three cases are deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A refresh token that is malformed, expired or whose subject is gone.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Missing, malformed, expired or revoked session proof.
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`].
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
