//! Authentication domain models: token claims, principals, session records.

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Discriminates the three token shapes so one cannot stand in for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Session,
    Access,
    Refresh,
}

/// Claims of the browser cookie session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub typ: TokenKind,
    /// User ID.
    pub id: String,
    pub role: String,
    pub has_password: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    /// Server-tracked session ID, present only when session tracking is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a short-lived bearer access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub typ: TokenKind,
    pub user_id: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a long-lived refresh token. Carries no role: the role is
/// re-read from storage on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub typ: TokenKind,
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// How the caller proved their identity for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofTransport {
    /// Identifier and password, verified in this request.
    Password,
    Cookie,
    Bearer,
}

/// Resolved identity of the caller for one request.
///
/// Built fresh from verified token claims and never persisted. Role-profile
/// IDs are not carried here; the access layer resolves them from `user_id`
/// when a policy needs them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub has_password: bool,
    #[serde(skip)]
    pub session_id: Option<String>,
    #[serde(skip)]
    pub transport: ProofTransport,
}

impl Principal {
    /// Principal for a stored user, proven by `transport`.
    pub fn from_user(user: &super::user::UserRecord, transport: ProofTransport) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role(),
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            has_password: user.has_password(),
            session_id: None,
            transport,
        }
    }
}

/// Server-tracked session row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub revoked: bool,
}

impl SessionRecord {
    pub fn is_active(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}
