//! Session resolution: request credential material to [`Principal`].
//!
//! Token verification is local and synchronous. Storage is only consulted
//! when a [`RevocationCheck`] is configured for tracked cookie sessions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::AuthError;
use super::jwt::TokenCodec;
use crate::models::auth::{Principal, ProofTransport};
use crate::models::role::Role;
use crate::store::{SessionStore, Store};

/// Session proof extracted from a request.
#[derive(Debug, Clone, Copy)]
pub enum SessionProof<'a> {
    /// Signed cookie session token.
    Cookie(&'a str),
    /// Bearer access token from the `Authorization` header.
    Bearer(&'a str),
}

/// Decides whether a tracked session is still live.
#[async_trait]
pub trait RevocationCheck: Send + Sync {
    async fn is_active(&self, session_id: &str, user_id: &str) -> Result<bool, AuthError>;
}

/// [`RevocationCheck`] over the session table.
pub struct StoreRevocation {
    store: Arc<dyn Store>,
}

impl StoreRevocation {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RevocationCheck for StoreRevocation {
    async fn is_active(&self, session_id: &str, user_id: &str) -> Result<bool, AuthError> {
        let session = self.store.find_session(session_id).await?;
        Ok(session.is_some_and(|s| s.user_id == user_id && s.is_active(Utc::now())))
    }
}

/// Resolves session proofs to principals.
pub struct SessionResolver {
    codec: Arc<TokenCodec>,
    revocation: Option<Arc<dyn RevocationCheck>>,
}

impl SessionResolver {
    /// Stateless resolver: trusts the token's embedded claims.
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            revocation: None,
        }
    }

    /// Consult `check` for every cookie session. Cookie tokens without a
    /// session ID are then rejected.
    pub fn with_revocation(mut self, check: Arc<dyn RevocationCheck>) -> Self {
        self.revocation = Some(check);
        self
    }

    pub async fn resolve(&self, proof: SessionProof<'_>) -> Result<Principal, AuthError> {
        match proof {
            SessionProof::Cookie(token) => self.resolve_cookie(token).await,
            SessionProof::Bearer(token) => self.resolve_bearer(token),
        }
    }

    async fn resolve_cookie(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.codec.verify_session(token)?;

        if let Some(check) = &self.revocation {
            let Some(sid) = claims.sid.as_deref() else {
                return Err(AuthError::NotAuthenticated("untracked session".into()));
            };
            if !check.is_active(sid, &claims.id).await? {
                debug!(user_id = %claims.id, session_id = sid, "session revoked or expired");
                return Err(AuthError::NotAuthenticated("session revoked".into()));
            }
        }

        Ok(Principal {
            user_id: claims.id,
            role: Role::from_name(&claims.role),
            email: claims.email,
            mobile: claims.mobile,
            has_password: claims.has_password,
            session_id: claims.sid,
            transport: ProofTransport::Cookie,
        })
    }

    /// Bearer tokens are only issued after a password login, so the
    /// principal always has a password.
    fn resolve_bearer(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.codec.verify_access(token)?;
        Ok(Principal {
            user_id: claims.user_id,
            role: Role::from_name(&claims.role),
            email: None,
            mobile: None,
            has_password: true,
            session_id: None,
            transport: ProofTransport::Bearer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::AuthConfig;
    use crate::auth::session::SessionIssuer;
    use crate::models::user::NewUser;
    use crate::store::memory::MemoryStore;
    use crate::store::{RoleStore, UserStore};

    fn principal(role: Role, has_password: bool) -> Principal {
        Principal {
            user_id: "u1".into(),
            role,
            email: None,
            mobile: Some("555".into()),
            has_password,
            session_id: None,
            transport: ProofTransport::Password,
        }
    }

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(&AuthConfig::new("secret").unwrap()))
    }

    #[tokio::test]
    async fn cookie_session_resolves_to_principal() {
        let codec = codec();
        let token = codec
            .encode_session(&principal(Role::Doctor, false), None)
            .unwrap()
            .token;
        let resolved = SessionResolver::new(codec)
            .resolve(SessionProof::Cookie(&token))
            .await
            .unwrap();
        assert_eq!(resolved.user_id, "u1");
        assert_eq!(resolved.role, Role::Doctor);
        assert!(!resolved.has_password);
        assert_eq!(resolved.transport, ProofTransport::Cookie);
    }

    #[tokio::test]
    async fn bearer_token_resolves_to_principal() {
        let codec = codec();
        let token = codec.encode_access("u1", &Role::Patient).unwrap().token;
        let resolved = SessionResolver::new(codec)
            .resolve(SessionProof::Bearer(&token))
            .await
            .unwrap();
        assert_eq!(resolved.role, Role::Patient);
        assert!(resolved.has_password);
        assert_eq!(resolved.transport, ProofTransport::Bearer);
    }

    #[tokio::test]
    async fn garbage_is_not_authenticated() {
        let resolver = SessionResolver::new(codec());
        for proof in [SessionProof::Cookie("x.y.z"), SessionProof::Bearer("")] {
            assert!(matches!(
                resolver.resolve(proof).await,
                Err(AuthError::NotAuthenticated(_))
            ));
        }
    }

    #[tokio::test]
    async fn a_session_token_is_not_a_bearer_token() {
        let codec = codec();
        let token = codec
            .encode_session(&principal(Role::Admin, true), None)
            .unwrap()
            .token;
        let result = SessionResolver::new(codec)
            .resolve(SessionProof::Bearer(&token))
            .await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated(_))));
    }

    #[tokio::test]
    async fn revoked_sessions_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let role = store.create_role("patient", None).await.unwrap();
        let user = store
            .create_user(NewUser {
                email: None,
                mobile: Some("800".into()),
                name: None,
                password_hash: Some("hash".into()),
                role_id: role.id,
            })
            .await
            .unwrap();

        let config = AuthConfig::new("secret").unwrap().with_session_tracking(true);
        let codec = Arc::new(TokenCodec::new(&config));
        let issuer = SessionIssuer::new(codec.clone(), store.clone(), &config);
        let resolver = SessionResolver::new(codec.clone())
            .with_revocation(Arc::new(StoreRevocation::new(store.clone())));

        let principal = Principal::from_user(&user, ProofTransport::Password);
        let session = issuer.issue_cookie(&principal).await.unwrap();
        let resolved = resolver
            .resolve(SessionProof::Cookie(&session.token))
            .await
            .unwrap();
        assert_eq!(resolved.session_id, session.session_id);

        issuer.revoke(&resolved).await.unwrap();
        let result = resolver.resolve(SessionProof::Cookie(&session.token)).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated(_))));

        let untracked = codec.encode_session(&principal, None).unwrap().token;
        let result = resolver.resolve(SessionProof::Cookie(&untracked)).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated(_))));
    }
}
