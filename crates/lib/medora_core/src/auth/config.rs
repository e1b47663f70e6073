//! Process-wide authentication settings.

use std::fmt;
use std::ops::RangeInclusive;

use chrono::Duration;

use super::AuthError;

/// Upper bound on the clock-drift tolerance applied to token expiry.
pub const MAX_LEEWAY_SECS: u64 = 60;

/// Cost factors bcrypt accepts.
pub const BCRYPT_COSTS: RangeInclusive<u32> = 4..=31;

/// Immutable authentication configuration, built once at startup and shared
/// by `Arc`.
#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    /// Lifetime of the cookie session token.
    pub session_ttl: Duration,
    /// Lifetime of a bearer access token.
    pub access_ttl: Duration,
    /// Lifetime of a bearer refresh token.
    pub refresh_ttl: Duration,
    pub leeway_secs: u64,
    pub bcrypt_cost: u32,
    /// Write a revocable session row for every cookie sign-in.
    pub session_tracking: bool,
}

impl AuthConfig {
    /// Configuration with default lifetimes. Fails when the secret is empty.
    pub fn new(jwt_secret: impl Into<String>) -> Result<Self, AuthError> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.trim().is_empty() {
            return Err(AuthError::Config("JWT secret must not be empty".into()));
        }
        Ok(Self {
            jwt_secret,
            session_ttl: Duration::hours(8),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            leeway_secs: MAX_LEEWAY_SECS,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            session_tracking: false,
        })
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Clamped to [`MAX_LEEWAY_SECS`].
    pub fn with_leeway_secs(mut self, secs: u64) -> Self {
        self.leeway_secs = secs.min(MAX_LEEWAY_SECS);
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn with_session_tracking(mut self, enabled: bool) -> Self {
        self.session_tracking = enabled;
        self
    }

    pub fn secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway_secs", &self.leeway_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("session_tracking", &self.session_tracking)
            .finish()
    }
}
