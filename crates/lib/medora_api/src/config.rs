//! API server configuration.

use chrono::Duration;
use medora_core::auth::AuthError;
use medora_core::auth::config::{AuthConfig, BCRYPT_COSTS};
use thiserror::Error;

/// Configuration errors. All of them abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL. Without one the server runs on the
    /// in-memory store.
    pub database_url: Option<String>,
    /// Token lifetimes, signing secret and hashing cost.
    pub auth: AuthConfig,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
    /// Shared secret for identity assertions. Federated sign-in is off
    /// without one.
    pub federated_secret: Option<String>,
}

impl ApiConfig {
    /// Configuration with defaults around an explicit auth config.
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            database_url: None,
            auth,
            cookie_secure: false,
            federated_secret: None,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                   | Default          |
    /// |----------------------------|------------------|
    /// | `BIND_ADDR`                | `127.0.0.1:3100` |
    /// | `DATABASE_URL`             | none (in-memory) |
    /// | `JWT_SECRET`               | required         |
    /// | `SESSION_TTL_HOURS`        | `8`              |
    /// | `ACCESS_TOKEN_TTL_MINUTES` | `15`             |
    /// | `REFRESH_TOKEN_TTL_DAYS`   | `7`              |
    /// | `BCRYPT_COST`              | `12`             |
    /// | `SESSION_TRACKING`         | `false`          |
    /// | `COOKIE_SECURE`            | `false`          |
    /// | `FEDERATED_ASSERTION_SECRET` | none (disabled) |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let mut auth = AuthConfig::new(secret)?;
        if let Some(ttl) = parse_ttl(&var, "SESSION_TTL_HOURS", Duration::try_hours)? {
            auth = auth.with_session_ttl(ttl);
        }
        if let Some(ttl) = parse_ttl(&var, "ACCESS_TOKEN_TTL_MINUTES", Duration::try_minutes)? {
            auth = auth.with_access_ttl(ttl);
        }
        if let Some(ttl) = parse_ttl(&var, "REFRESH_TOKEN_TTL_DAYS", Duration::try_days)? {
            auth = auth.with_refresh_ttl(ttl);
        }
        if let Some(cost) = parse::<u32>(&var, "BCRYPT_COST")? {
            if !BCRYPT_COSTS.contains(&cost) {
                return Err(ConfigError::Invalid {
                    var: "BCRYPT_COST",
                    value: cost.to_string(),
                });
            }
            auth = auth.with_bcrypt_cost(cost);
        }
        if let Some(tracking) = parse_flag(&var, "SESSION_TRACKING")? {
            auth = auth.with_session_tracking(tracking);
        }

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3100".into()),
            database_url: var("DATABASE_URL"),
            auth,
            cookie_secure: parse_flag(&var, "COOKIE_SECURE")?.unwrap_or(false),
            federated_secret: var("FEDERATED_ASSERTION_SECRET"),
        })
    }
}

fn parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match var(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var: name,
                value: raw,
            }),
    }
}

/// A positive lifetime in the unit `to_duration` converts from.
fn parse_ttl(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Option<Duration>, ConfigError> {
    let Some(amount) = parse::<i64>(var, name)? else {
        return Ok(None);
    };
    match to_duration(amount) {
        Some(ttl) if amount > 0 => Ok(Some(ttl)),
        _ => Err(ConfigError::Invalid {
            var: name,
            value: amount.to_string(),
        }),
    }
}

fn parse_flag(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    match var(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(None),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(Some(true)),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(Some(false)),
        Some(value) => Err(ConfigError::Invalid { var: name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn missing_secret_fails_fast() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("JWT_SECRET"))));
        assert!(matches!(
            config(&[("JWT_SECRET", "  ")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:3100");
        assert!(config.database_url.is_none());
        assert_eq!(config.auth.access_ttl, Duration::minutes(15));
        assert!(!config.auth.session_tracking);
        assert!(!config.cookie_secure);
        assert!(config.federated_secret.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("JWT_SECRET", "s"),
            ("ACCESS_TOKEN_TTL_MINUTES", "5"),
            ("REFRESH_TOKEN_TTL_DAYS", "30"),
            ("SESSION_TRACKING", "true"),
            ("BCRYPT_COST", "4"),
        ])
        .unwrap();
        assert_eq!(config.auth.access_ttl, Duration::minutes(5));
        assert_eq!(config.auth.refresh_ttl, Duration::days(30));
        assert_eq!(config.auth.bcrypt_cost, 4);
        assert!(config.auth.session_tracking);
    }

    #[test]
    fn garbage_values_are_rejected() {
        assert!(matches!(
            config(&[("JWT_SECRET", "s"), ("BCRYPT_COST", "lots")]),
            Err(ConfigError::Invalid { var: "BCRYPT_COST", .. })
        ));
        assert!(matches!(
            config(&[("JWT_SECRET", "s"), ("COOKIE_SECURE", "maybe")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn lifetimes_must_be_positive_and_representable() {
        for (name, value) in [
            ("SESSION_TTL_HOURS", "-5"),
            ("SESSION_TTL_HOURS", "9999999999999"),
            ("ACCESS_TOKEN_TTL_MINUTES", "0"),
            ("REFRESH_TOKEN_TTL_DAYS", "-1"),
            ("REFRESH_TOKEN_TTL_DAYS", "999999999999"),
        ] {
            let result = config(&[("JWT_SECRET", "s"), (name, value)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { var, .. }) if var == name),
                "{name}={value} was accepted"
            );
        }
        let config = config(&[("JWT_SECRET", "s"), ("SESSION_TTL_HOURS", "1")]).unwrap();
        assert_eq!(config.auth.session_ttl, Duration::hours(1));
    }

    #[test]
    fn bcrypt_cost_is_bounded() {
        for cost in ["3", "32", "99"] {
            assert!(matches!(
                config(&[("JWT_SECRET", "s"), ("BCRYPT_COST", cost)]),
                Err(ConfigError::Invalid { var: "BCRYPT_COST", .. })
            ));
        }
        for cost in ["4", "31"] {
            assert!(config(&[("JWT_SECRET", "s"), ("BCRYPT_COST", cost)]).is_ok());
        }
    }
}
