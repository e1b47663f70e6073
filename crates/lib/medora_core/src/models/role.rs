//! Role domain models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The role a principal acts under.
///
/// The four built-in roles drive every role-specific branch in the access
/// layer. Roles created by an administrator at runtime are carried as
/// [`Role::Other`]; they authenticate but own nothing, so every ownership
/// policy rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Doctor,
    HealthAdvisor,
    Patient,
    Other(String),
}

impl Role {
    /// Built-in roles, in seeding order.
    pub const BUILT_IN: [Role; 4] = [Role::Admin, Role::Doctor, Role::HealthAdvisor, Role::Patient];

    /// Parse a stored role name. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase();
        match normalized.as_str() {
            "admin" => Role::Admin,
            "doctor" => Role::Doctor,
            "health_advisor" => Role::HealthAdvisor,
            "patient" => Role::Patient,
            _ => Role::Other(normalized),
        }
    }

    /// Canonical lowercase name as stored in the `roles` table.
    pub fn name(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::HealthAdvisor => "health_advisor",
            Role::Patient => "patient",
            Role::Other(name) => name,
        }
    }

    /// Whether the role is one of the four built-in roles.
    pub fn is_built_in(&self) -> bool {
        !matches!(self, Role::Other(_))
    }

    /// The role-profile table a user with this role must have a row in.
    pub fn profile_kind(&self) -> Option<ProfileKind> {
        match self {
            Role::Doctor => Some(ProfileKind::Doctor),
            Role::HealthAdvisor => Some(ProfileKind::HealthAdvisor),
            Role::Patient => Some(ProfileKind::Patient),
            Role::Admin | Role::Other(_) => None,
        }
    }

    /// Landing page for the role's dashboard.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Doctor => "/doctor/dashboard",
            Role::HealthAdvisor => "/health_advisor/dashboard",
            Role::Patient => "/patient/dashboard",
            Role::Other(_) => "/user/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Role::from_name(&name))
    }
}

/// Role-profile tables, each linked 1:1 to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Doctor,
    HealthAdvisor,
    Patient,
}

impl ProfileKind {
    pub fn table(self) -> &'static str {
        match self {
            ProfileKind::Doctor => "doctors",
            ProfileKind::HealthAdvisor => "health_advisors",
            ProfileKind::Patient => "patients",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProfileKind::Doctor => "Doctor",
            ProfileKind::HealthAdvisor => "Health advisor",
            ProfileKind::Patient => "Patient",
        }
    }
}

/// Role row with its reference count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Number of users currently assigned to the role.
    pub user_count: i64,
}

/// Partial role update. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct RolePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl RolePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(Role::from_name("Doctor"), Role::Doctor);
        assert_eq!(Role::from_name(" HEALTH_ADVISOR "), Role::HealthAdvisor);
        assert_eq!(Role::from_name("Nurse"), Role::Other("nurse".into()));
    }

    #[test]
    fn only_clinical_roles_carry_profiles() {
        assert_eq!(Role::Admin.profile_kind(), None);
        assert_eq!(Role::Other("staff".into()).profile_kind(), None);
        assert_eq!(Role::Doctor.profile_kind(), Some(ProfileKind::Doctor));
        assert_eq!(Role::Patient.profile_kind(), Some(ProfileKind::Patient));
    }

    #[test]
    fn serializes_as_lowercase_name() {
        let json = serde_json::to_string(&Role::HealthAdvisor).unwrap();
        assert_eq!(json, "\"health_advisor\"");
        let back: Role = serde_json::from_str("\"Admin\"").unwrap();
        assert_eq!(back, Role::Admin);
    }

    #[test]
    fn unknown_roles_land_on_generic_dashboard() {
        assert_eq!(Role::Other("nurse".into()).dashboard_path(), "/user/dashboard");
        assert_eq!(Role::HealthAdvisor.dashboard_path(), "/health_advisor/dashboard");
    }
}
