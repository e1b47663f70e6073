//! Session issuance: cookie sessions and bearer token pairs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::AuthError;
use super::config::AuthConfig;
use super::jwt::TokenCodec;
use crate::models::auth::Principal;
use crate::store::{SessionStore, Store, UserStore};

/// A signed cookie session.
#[derive(Debug, Clone)]
pub struct CookieSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Tracked session row, when session tracking is on.
    pub session_id: Option<String>,
}

/// Access + refresh tokens for non-browser clients.
#[derive(Debug, Clone)]
pub struct BearerPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// A fresh access token minted from a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshedAccess {
    pub access_token: String,
    pub expires_in: i64,
}

/// Issues session proofs for verified principals.
pub struct SessionIssuer {
    codec: Arc<TokenCodec>,
    store: Arc<dyn Store>,
    session_tracking: bool,
    session_ttl: chrono::Duration,
}

impl SessionIssuer {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn Store>, config: &AuthConfig) -> Self {
        Self {
            codec,
            store,
            session_tracking: config.session_tracking,
            session_ttl: config.session_ttl,
        }
    }

    /// Sign a cookie session; writes a tracked session row first when
    /// tracking is on.
    pub async fn issue_cookie(&self, principal: &Principal) -> Result<CookieSession, AuthError> {
        let session_id = if self.session_tracking {
            let record = self
                .store
                .create_session(&principal.user_id, Utc::now() + self.session_ttl)
                .await?;
            Some(record.id)
        } else {
            None
        };

        let signed = self.codec.encode_session(principal, session_id.as_deref())?;
        info!(user_id = %principal.user_id, role = %principal.role, tracked = session_id.is_some(), "cookie session issued");
        Ok(CookieSession {
            token: signed.token,
            expires_at: signed.expires_at,
            session_id,
        })
    }

    /// Issue an access/refresh pair. The refresh token carries no role.
    pub fn issue_bearer(&self, principal: &Principal) -> Result<BearerPair, AuthError> {
        let access = self.codec.encode_access(&principal.user_id, &principal.role)?;
        let refresh = self.codec.encode_refresh(&principal.user_id)?;
        info!(user_id = %principal.user_id, role = %principal.role, "bearer pair issued");
        Ok(BearerPair {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: self.codec.access_ttl().num_seconds(),
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The role is re-read from storage, never taken from the token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, AuthError> {
        let claims = self.codec.verify_refresh(refresh_token)?;
        let Some(user) = self.store.find_user_by_id(&claims.user_id).await? else {
            debug!(user_id = %claims.user_id, "refresh for deleted user");
            return Err(AuthError::InvalidToken("user no longer exists".into()));
        };

        let role = user.role();
        let access = self.codec.encode_access(&user.id, &role)?;
        debug!(user_id = %user.id, role = %role, "access token refreshed");
        Ok(RefreshedAccess {
            access_token: access.token,
            expires_in: self.codec.access_ttl().num_seconds(),
        })
    }

    /// Revoke the principal's tracked session, if any.
    pub async fn revoke(&self, principal: &Principal) -> Result<(), AuthError> {
        if let Some(session_id) = principal.session_id.as_deref() {
            self.store.revoke_session(session_id).await?;
            info!(user_id = %principal.user_id, session_id, "session revoked");
        }
        Ok(())
    }

    /// Revoke every tracked session of a user, e.g. after a password or
    /// role change.
    pub async fn revoke_all(&self, user_id: &str) -> Result<(), AuthError> {
        self.store.revoke_user_sessions(user_id, None).await?;
        debug!(user_id, "all sessions revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::ProofTransport;
    use crate::models::role::Role;
    use crate::models::user::{NewUser, UserPatch};
    use crate::store::memory::MemoryStore;
    use crate::store::RoleStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        codec: Arc<TokenCodec>,
        issuer: SessionIssuer,
    }

    async fn fixture(tracking: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        for name in ["doctor", "patient"] {
            store.create_role(name, None).await.unwrap();
        }
        let config = AuthConfig::new("secret")
            .unwrap()
            .with_session_tracking(tracking);
        let codec = Arc::new(TokenCodec::new(&config));
        let issuer = SessionIssuer::new(codec.clone(), store.clone(), &config);
        Fixture {
            store,
            codec,
            issuer,
        }
    }

    async fn patient(store: &MemoryStore) -> Principal {
        let role = store.find_role_by_name("patient").await.unwrap().unwrap();
        let user = store
            .create_user(NewUser {
                email: None,
                mobile: Some("700".into()),
                name: None,
                password_hash: Some("hash".into()),
                role_id: role.id,
            })
            .await
            .unwrap();
        Principal::from_user(&user, ProofTransport::Password)
    }

    #[tokio::test]
    async fn refresh_reresolves_the_current_role() {
        let f = fixture(false).await;
        let principal = patient(&f.store).await;
        let pair = f.issuer.issue_bearer(&principal).unwrap();
        assert_eq!(
            f.codec.verify_access(&pair.access_token).unwrap().role,
            "patient"
        );

        let doctor = f.store.find_role_by_name("doctor").await.unwrap().unwrap();
        let patch = UserPatch {
            role_id: Some(doctor.id),
            ..UserPatch::default()
        };
        f.store.update_user(&principal.user_id, patch).await.unwrap();

        let refreshed = f.issuer.refresh(&pair.refresh_token).await.unwrap();
        let claims = f.codec.verify_access(&refreshed.access_token).unwrap();
        assert_eq!(claims.role, Role::Doctor.name());
        assert_eq!(refreshed.expires_in, 15 * 60);
    }

    #[tokio::test]
    async fn refresh_fails_once_the_user_is_gone() {
        let f = fixture(false).await;
        let principal = patient(&f.store).await;
        let pair = f.issuer.issue_bearer(&principal).unwrap();
        f.store.delete_user(&principal.user_id).await.unwrap();

        let result = f.issuer.refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_token() {
        let f = fixture(false).await;
        let principal = patient(&f.store).await;
        let pair = f.issuer.issue_bearer(&principal).unwrap();
        let result = f.issuer.refresh(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn tracked_cookie_sessions_write_a_row() {
        let f = fixture(true).await;
        let principal = patient(&f.store).await;
        let session = f.issuer.issue_cookie(&principal).await.unwrap();

        let sid = session.session_id.unwrap();
        let claims = f.codec.verify_session(&session.token).unwrap();
        assert_eq!(claims.sid.as_deref(), Some(sid.as_str()));
        assert!(!f.store.find_session(&sid).await.unwrap().unwrap().revoked);
    }

    #[tokio::test]
    async fn untracked_cookie_sessions_are_stateless() {
        let f = fixture(false).await;
        let principal = patient(&f.store).await;
        let session = f.issuer.issue_cookie(&principal).await.unwrap();
        assert!(session.session_id.is_none());
        assert!(f.codec.verify_session(&session.token).unwrap().sid.is_none());
    }
}
