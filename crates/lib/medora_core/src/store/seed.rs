//! Default data: the built-in roles and the first administrator.

use tracing::info;

use super::{RoleStore, Store, UserStore};
use crate::auth::AuthError;
use crate::auth::password::PasswordHasher;
use crate::models::role::Role;
use crate::models::user::NewUser;

pub const ADMIN_EMAIL: &str = "admin@hospital.com";
pub const ADMIN_MOBILE: &str = "9999999999";
pub const ADMIN_PASSWORD: &str = "admin123";

fn role_description(role: &Role) -> &'static str {
    match role {
        Role::Admin => "Hospital administrator",
        Role::Doctor => "Doctor",
        Role::HealthAdvisor => "Health advisor",
        Role::Patient => "Patient",
        Role::Other(_) => "",
    }
}

/// What [`seed_defaults`] had to create.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: usize,
    pub admin_created: bool,
}

/// Create missing built-in roles and the default admin. Idempotent.
pub async fn seed_defaults(
    store: &dyn Store,
    hasher: &PasswordHasher,
) -> Result<SeedReport, AuthError> {
    let mut report = SeedReport::default();

    for role in Role::BUILT_IN {
        if store.find_role_by_name(role.name()).await?.is_none() {
            store
                .create_role(role.name(), Some(role_description(&role)))
                .await?;
            report.roles_created += 1;
        }
    }

    if store.find_user_by_identifier(ADMIN_MOBILE).await?.is_none() {
        let admin_role = store
            .find_role_by_name(Role::Admin.name())
            .await?
            .ok_or_else(|| AuthError::Internal("admin role missing after seeding".into()))?;
        store
            .create_user(NewUser {
                email: Some(ADMIN_EMAIL.into()),
                mobile: Some(ADMIN_MOBILE.into()),
                name: Some("Administrator".into()),
                password_hash: Some(hasher.hash(ADMIN_PASSWORD).await?),
                role_id: admin_role.id,
            })
            .await?;
        report.admin_created = true;
    }

    info!(
        roles_created = report.roles_created,
        admin_created = report.admin_created,
        "default data seeded"
    );
    Ok(report)
}
