//! JWT encoding and verification (HS256).
//!
//! Three token shapes share one signing key. Each carries a `typ` claim that
//! is checked on decode, so an access token is never accepted where a refresh
//! or session token is expected.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::AuthError;
use super::config::AuthConfig;
use crate::models::auth::{AccessClaims, Principal, RefreshClaims, SessionClaims, TokenKind};
use crate::models::role::Role;

/// A signed token and its absolute expiry.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Claims that declare their own token kind.
trait TypedClaims: DeserializeOwned {
    fn kind(&self) -> TokenKind;
}

impl TypedClaims for SessionClaims {
    fn kind(&self) -> TokenKind {
        self.typ
    }
}

impl TypedClaims for AccessClaims {
    fn kind(&self) -> TokenKind {
        self.typ
    }
}

impl TypedClaims for RefreshClaims {
    fn kind(&self) -> TokenKind {
        self.typ
    }
}

/// Signs and verifies every token the service issues.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    session_ttl: Duration,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_secs;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(config.secret()),
            decoding: DecodingKey::from_secret(config.secret()),
            validation,
            session_ttl: config.session_ttl,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    // -------------------------------------------------------------------------
    // Encoding
    // -------------------------------------------------------------------------

    /// Cookie session token embedding `{id, role, hasPassword}`.
    pub fn encode_session(
        &self,
        principal: &Principal,
        session_id: Option<&str>,
    ) -> Result<SignedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.session_ttl;
        let claims = SessionClaims {
            typ: TokenKind::Session,
            id: principal.user_id.clone(),
            role: principal.role.name().to_string(),
            has_password: principal.has_password,
            email: principal.email.clone(),
            mobile: principal.mobile.clone(),
            sid: session_id.map(str::to_string),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok(SignedToken {
            token: self.sign(&claims)?,
            expires_at,
        })
    }

    /// Short-lived bearer access token carrying `{userId, role}`.
    pub fn encode_access(&self, user_id: &str, role: &Role) -> Result<SignedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;
        let claims = AccessClaims {
            typ: TokenKind::Access,
            user_id: user_id.to_string(),
            role: role.name().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok(SignedToken {
            token: self.sign(&claims)?,
            expires_at,
        })
    }

    /// Long-lived refresh token carrying `{userId}` only.
    pub fn encode_refresh(&self, user_id: &str) -> Result<SignedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.refresh_ttl;
        let claims = RefreshClaims {
            typ: TokenKind::Refresh,
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok(SignedToken {
            token: self.sign(&claims)?,
            expires_at,
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    // -------------------------------------------------------------------------
    // Verification
    // -------------------------------------------------------------------------

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify(token, TokenKind::Session)
            .map_err(AuthError::NotAuthenticated)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.verify(token, TokenKind::Access)
            .map_err(AuthError::NotAuthenticated)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        self.verify(token, TokenKind::Refresh)
            .map_err(AuthError::InvalidToken)
    }

    fn verify<T: TypedClaims>(&self, token: &str, expected: TokenKind) -> Result<T, String> {
        let claims = decode::<T>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!(error = %e, kind = ?expected, "token rejected");
                format!("jwt decode: {e}")
            })?
            .claims;
        if claims.kind() != expected {
            debug!(kind = ?claims.kind(), expected = ?expected, "token kind mismatch");
            return Err(format!("expected a {expected:?} token"));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::ProofTransport;

    fn codec() -> TokenCodec {
        TokenCodec::new(&AuthConfig::new("test-secret").unwrap())
    }

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: "u1".into(),
            role,
            email: Some("a@b.c".into()),
            mobile: Some("555".into()),
            has_password: false,
            session_id: None,
            transport: ProofTransport::Password,
        }
    }

    #[test]
    fn session_round_trip_keeps_has_password() {
        let codec = codec();
        let signed = codec.encode_session(&principal(Role::Patient), Some("s1")).unwrap();
        let claims = codec.verify_session(&signed.token).unwrap();
        assert_eq!(claims.id, "u1");
        assert_eq!(claims.role, "patient");
        assert!(!claims.has_password);
        assert_eq!(claims.sid.as_deref(), Some("s1"));
    }

    #[test]
    fn expired_token_is_rejected_despite_valid_signature() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            typ: TokenKind::Session,
            id: "u1".into(),
            role: "admin".into(),
            has_password: true,
            email: None,
            mobile: None,
            sid: None,
            iat: now - 7200,
            exp: now - 120,
        };
        let token = codec.sign(&claims).unwrap();
        assert!(matches!(
            codec.verify_session(&token),
            Err(AuthError::NotAuthenticated(_))
        ));
    }

    #[test]
    fn expiry_within_leeway_is_tolerated() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            typ: TokenKind::Access,
            user_id: "u1".into(),
            role: "doctor".into(),
            iat: now - 900,
            exp: now - 5,
        };
        let token = codec.sign(&claims).unwrap();
        assert!(codec.verify_access(&token).is_ok());
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let codec = codec();
        let access = codec.encode_access("u1", &Role::Doctor).unwrap();
        let refresh = codec.encode_refresh("u1").unwrap();

        assert!(codec.verify_refresh(&access.token).is_err());
        assert!(codec.verify_session(&access.token).is_err());
        assert!(codec.verify_access(&refresh.token).is_err());
    }

    #[test]
    fn refresh_failures_are_invalid_token() {
        assert!(matches!(
            codec().verify_refresh("garbage"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenCodec::new(&AuthConfig::new("another-secret").unwrap());
        let token = other.encode_access("u1", &Role::Admin).unwrap();
        assert!(codec().verify_access(&token.token).is_err());
    }
}
