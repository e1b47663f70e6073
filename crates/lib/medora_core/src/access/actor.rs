//! Resolve a principal's role-scoped profile.

use tracing::warn;

use super::AccessError;
use crate::models::auth::Principal;
use crate::models::role::{ProfileKind, Role};
use crate::store::ProfileStore;

/// A principal together with the profile row its role acts through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Admin,
    Doctor { profile_id: String },
    HealthAdvisor { profile_id: String },
    Patient { profile_id: String },
    /// Administrator-created role. Owns nothing.
    Other(String),
}

impl Actor {
    /// Look up the profile row for profile-bearing roles.
    ///
    /// A clinical role with no profile row is an inconsistent account and is
    /// rejected as not authorized.
    pub async fn resolve(
        profiles: &dyn ProfileStore,
        principal: &Principal,
    ) -> Result<Actor, AccessError> {
        let kind = match &principal.role {
            Role::Admin => return Ok(Actor::Admin),
            Role::Other(name) => return Ok(Actor::Other(name.clone())),
            role => role.profile_kind(),
        };
        let Some(kind) = kind else {
            return Ok(Actor::Other(principal.role.name().to_string()));
        };

        let Some(profile_id) = profiles.find_profile_id(&principal.user_id, kind).await? else {
            warn!(user_id = %principal.user_id, role = %principal.role, "role without profile row");
            return Err(AccessError::NotAuthorized(format!(
                "{} role has no {} profile",
                principal.role,
                kind.label()
            )));
        };

        Ok(match kind {
            ProfileKind::Doctor => Actor::Doctor { profile_id },
            ProfileKind::HealthAdvisor => Actor::HealthAdvisor { profile_id },
            ProfileKind::Patient => Actor::Patient { profile_id },
        })
    }

    /// Short label for logs.
    pub fn describe(&self) -> String {
        match self {
            Actor::Admin => "admin".into(),
            Actor::Doctor { profile_id } => format!("doctor {profile_id}"),
            Actor::HealthAdvisor { profile_id } => format!("health advisor {profile_id}"),
            Actor::Patient { profile_id } => format!("patient {profile_id}"),
            Actor::Other(role) => format!("role {role}"),
        }
    }
}
