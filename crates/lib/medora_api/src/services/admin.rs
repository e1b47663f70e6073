//! Administration service: users, roles, staff directories and dashboards.
//!
//! Callers are already gated by the admin (or health-advisor) role guard;
//! the checks here are about input shape and referential rules.

use medora_core::auth::validate_password;
use medora_core::models::auth::Principal;
use medora_core::models::clinical::{OwnerScope, Totals};
use medora_core::models::role::{ProfileKind, Role, RolePatch, RoleRecord};
use medora_core::models::user::{NewUser, Profile, UserPatch};
use medora_core::store::{ClinicalStore, ProfileStore, RoleStore, Store, UserStore};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    AdvisorDashboard, CreateRoleRequest, CreateUserRequest, PatientDetail, UpdateRoleRequest,
    UpdateUserRequest, UserView,
};

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn require_role_record(store: &dyn Store, role_id: &str) -> AppResult<RoleRecord> {
    store
        .find_role_by_id(role_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Role not found".into()))
}

// =============================================================================
// Users
// =============================================================================

pub async fn list_users(store: &dyn Store) -> AppResult<Vec<UserView>> {
    let users = store.list_users().await?;
    Ok(users.into_iter().map(UserView::from).collect())
}

pub async fn get_user(store: &dyn Store, id: &str) -> AppResult<UserView> {
    store
        .find_user_by_id(id)
        .await?
        .map(UserView::from)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn create_user(state: &AppState, body: CreateUserRequest) -> AppResult<UserView> {
    let mobile = trimmed(body.mobile.as_deref())
        .ok_or_else(|| AppError::Validation("Mobile number is required".into()))?;
    let role_id = body.role_id.trim();
    if role_id.is_empty() {
        return Err(AppError::Validation("Role is required".into()));
    }
    validate_password(&body.password)?;

    let store = state.store.as_ref();
    let role = require_role_record(store, role_id).await?;
    let hash = state.hasher.hash(&body.password).await?;

    let user = store
        .create_user(NewUser {
            email: trimmed(body.email.as_deref()),
            mobile: Some(mobile),
            name: trimmed(body.name.as_deref()),
            password_hash: Some(hash),
            role_id: role.id,
        })
        .await?;
    info!(user_id = %user.id, role = %user.role_name, "user created by admin");
    Ok(user.into())
}

/// Partial update. Changing the role revokes the user's tracked sessions so
/// the new role takes effect on the next sign-in.
pub async fn update_user(
    state: &AppState,
    id: &str,
    body: UpdateUserRequest,
) -> AppResult<UserView> {
    if body.email.is_none()
        && body.mobile.is_none()
        && body.password.is_none()
        && body.role_id.is_none()
    {
        return Err(AppError::Validation("No fields to update".into()));
    }
    let store = state.store.as_ref();
    let current = store
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let mut patch = UserPatch {
        email: body.email.as_deref().map(|e| trimmed(Some(e))),
        ..UserPatch::default()
    };
    if let Some(mobile) = body.mobile.as_deref() {
        patch.mobile = Some(
            trimmed(Some(mobile))
                .ok_or_else(|| AppError::Validation("Mobile number cannot be empty".into()))?,
        );
    }
    if let Some(password) = body.password.as_deref() {
        validate_password(password)?;
        patch.password_hash = Some(state.hasher.hash(password).await?);
    }
    if let Some(role_id) = body.role_id.as_deref().map(str::trim) {
        let role = require_role_record(store, role_id).await?;
        if role.id != current.role_id {
            patch.role_id = Some(role.id);
        }
    }
    if patch.is_empty() {
        return Ok(current.into());
    }

    let email_after = match &patch.email {
        Some(email) => email.clone(),
        None => current.email.clone(),
    };
    let mobile_after = patch.mobile.clone().or(current.mobile.clone());
    if email_after.is_none() && mobile_after.is_none() {
        return Err(AppError::Validation(
            "A user needs an email or a mobile number".into(),
        ));
    }

    let role_changed = patch.role_id.is_some();
    let updated = store
        .update_user(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if role_changed {
        state.issuer.revoke_all(id).await?;
        info!(user_id = %id, role = %updated.role_name, "user role changed");
    }
    Ok(updated.into())
}

pub async fn delete_user(store: &dyn Store, principal: &Principal, id: &str) -> AppResult<()> {
    if principal.user_id == id {
        return Err(AppError::Validation("You cannot delete your own account".into()));
    }
    if !store.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    info!(user_id = %id, "user deleted");
    Ok(())
}

// =============================================================================
// Roles
// =============================================================================

/// Role names are stored trimmed and lowercased.
fn normalize_role_name(name: &str) -> AppResult<String> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::Validation("Role name is required".into()));
    }
    Ok(name)
}

fn ensure_mutable(role: &RoleRecord) -> AppResult<()> {
    if Role::from_name(&role.name).is_built_in() {
        return Err(AppError::Validation(format!(
            "Built-in role '{}' cannot be modified",
            role.name
        )));
    }
    Ok(())
}

pub async fn list_roles(store: &dyn Store) -> AppResult<Vec<RoleRecord>> {
    Ok(store.list_roles().await?)
}

pub async fn get_role(store: &dyn Store, id: &str) -> AppResult<RoleRecord> {
    require_role_record(store, id).await
}

pub async fn create_role(store: &dyn Store, body: CreateRoleRequest) -> AppResult<RoleRecord> {
    let name = normalize_role_name(&body.name)?;
    if store.find_role_by_name(&name).await?.is_some() {
        return Err(AppError::Conflict("Role with this name already exists".into()));
    }
    let role = store
        .create_role(&name, trimmed(body.description.as_deref()).as_deref())
        .await?;
    info!(role_id = %role.id, name = %role.name, "role created");
    Ok(role)
}

pub async fn update_role(
    store: &dyn Store,
    id: &str,
    body: UpdateRoleRequest,
) -> AppResult<RoleRecord> {
    let current = require_role_record(store, id).await?;
    let patch = RolePatch {
        name: body.name.as_deref().map(normalize_role_name).transpose()?,
        description: body.description.as_deref().map(|d| trimmed(Some(d))),
    };
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".into()));
    }
    if patch
        .name
        .as_deref()
        .is_some_and(|name| name != current.name)
    {
        ensure_mutable(&current)?;
    }

    let updated = store
        .update_role(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Role not found".into()))?;
    info!(role_id = %id, name = %updated.name, "role updated");
    Ok(updated)
}

pub async fn delete_role(store: &dyn Store, id: &str) -> AppResult<()> {
    let current = require_role_record(store, id).await?;
    ensure_mutable(&current)?;
    if !store.delete_role(id).await? {
        return Err(AppError::NotFound("Role not found".into()));
    }
    info!(role_id = %id, name = %current.name, "role deleted");
    Ok(())
}

// =============================================================================
// Staff and patient directories
// =============================================================================

pub async fn list_profiles(store: &dyn Store, kind: ProfileKind) -> AppResult<Vec<Profile>> {
    Ok(store.list_profiles(kind).await?)
}

pub async fn get_profile(store: &dyn Store, kind: ProfileKind, id: &str) -> AppResult<Profile> {
    store
        .get_profile(kind, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.label())))
}

/// A patient with everything recorded against them.
pub async fn patient_detail(store: &dyn Store, id: &str) -> AppResult<PatientDetail> {
    let profile = get_profile(store, ProfileKind::Patient, id).await?;
    let scope = OwnerScope::Patient(profile.id.clone());
    Ok(PatientDetail {
        appointments: store.list_appointments(&scope).await?,
        prescriptions: store.list_prescriptions(&scope).await?,
        consultations: store.list_consultations(&scope).await?,
        profile,
    })
}

// =============================================================================
// Dashboards
// =============================================================================

pub async fn admin_dashboard(store: &dyn Store) -> AppResult<Totals> {
    Ok(store.totals().await?)
}

/// Counts for the health-advisor workspace. Consultations are the calling
/// advisor's own.
pub async fn advisor_dashboard(
    store: &dyn Store,
    principal: &Principal,
) -> AppResult<AdvisorDashboard> {
    let advisor_id = store
        .find_profile_id(&principal.user_id, ProfileKind::HealthAdvisor)
        .await?
        .ok_or_else(|| AppError::Forbidden("health advisor profile missing".into()))?;
    let totals = store.totals().await?;
    let consultations = store
        .count_consultations(&OwnerScope::Advisor(advisor_id))
        .await?;
    Ok(AdvisorDashboard {
        patients: totals.patients,
        consultations,
        appointments: totals.appointments,
    })
}
