//! User and role-profile models.

use serde::{Deserialize, Serialize};

use super::role::Role;

/// User row joined with its role.
///
/// The password hash never leaves the process: it is skipped on
/// serialization and only read by the credential verifier.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role_id: String,
    pub role_name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl UserRecord {
    pub fn role(&self) -> Role {
        Role::from_name(&self.role_name)
    }

    /// False for accounts provisioned through a federated identity that have
    /// not yet set a local password.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Input for creating a user. At least one of `email`/`mobile` must be set.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role_id: String,
}

/// Partial user update.
///
/// `email: Some(None)` clears the email; `role_id` triggers a profile swap
/// when the new role needs a different role-profile row.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<Option<String>>,
    pub mobile: Option<String>,
    pub password_hash: Option<String>,
    pub role_id: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.mobile.is_none()
            && self.password_hash.is_none()
            && self.role_id.is_none()
    }
}

/// A doctor, health-advisor or patient profile row with its user's contact
/// details.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub name: Option<String>,
    /// Only meaningful for doctors and health advisors.
    pub specialization: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
}
