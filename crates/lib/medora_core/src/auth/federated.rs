//! Sign-in through an external identity provider.
//!
//! The provider handshake (OAuth redirect, code exchange) happens in front of
//! this service. What reaches us is a short-lived assertion naming a verified
//! email; an [`IdentityVerifier`] checks it and the account behind the email
//! is provisioned on first use.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AuthError;
use super::signup::provision_federated_user;
use crate::models::auth::{Principal, ProofTransport};
use crate::store::Store;

/// Identity vouched for by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub email: String,
    pub name: Option<String>,
}

/// Checks a provider assertion. Any rejection is
/// [`AuthError::InvalidCredentials`].
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, assertion: &str) -> Result<FederatedIdentity, AuthError>;
}

/// Claims of an identity assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionClaims {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub exp: i64,
}

/// Verifies HS256 assertions signed with a secret shared with the identity
/// front end. Only verified emails are accepted.
pub struct AssertionVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl AssertionVerifier {
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::Config(
                "federated assertion secret must not be empty".into(),
            ));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Ok(Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

#[async_trait]
impl IdentityVerifier for AssertionVerifier {
    async fn verify(&self, assertion: &str) -> Result<FederatedIdentity, AuthError> {
        let claims = decode::<AssertionClaims>(assertion, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "identity assertion rejected");
                AuthError::InvalidCredentials
            })?
            .claims;
        if !claims.email_verified {
            debug!("identity assertion for an unverified email");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(FederatedIdentity {
            email: claims.email,
            name: claims.name,
        })
    }
}

/// Verify `assertion` and resolve it to a principal, creating a password-less
/// patient account for an email seen for the first time.
pub async fn federated_sign_in(
    store: &dyn Store,
    verifier: &dyn IdentityVerifier,
    assertion: &str,
) -> Result<Principal, AuthError> {
    let identity = verifier.verify(assertion).await?;
    let user = provision_federated_user(store, &identity.email, identity.name.as_deref()).await?;
    Ok(Principal::from_user(&user, ProofTransport::Cookie))
}
