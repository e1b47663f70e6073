//! Administration handlers. Mounted behind the admin role guard.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use medora_core::models::clinical::Totals;
use medora_core::models::role::{ProfileKind, RoleRecord};
use medora_core::models::user::Profile;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ApiResponse, CreateRoleRequest, CreateUserRequest, PatientDetail, UpdateRoleRequest,
    UpdateUserRequest, UserView,
};
use crate::services::admin;

pub async fn dashboard_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Totals>>> {
    let totals = admin::admin_dashboard(state.store.as_ref()).await?;
    Ok(Json(ApiResponse::ok(totals)))
}

// =============================================================================
// Users
// =============================================================================

pub async fn list_users_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<UserView>>>> {
    let users = admin::list_users(state.store.as_ref()).await?;
    Ok(Json(ApiResponse::list(users)))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = admin::get_user(state.store.as_ref(), &id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserView>>)> {
    let user = admin::create_user(&state, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(user).with_message("User created")),
    ))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = admin::update_user(&state, &id, body).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    admin::delete_user(state.store.as_ref(), &principal, &id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("User deleted")))
}

// =============================================================================
// Roles
// =============================================================================

/// `GET /api/admin/roles`. Each role carries its user count.
pub async fn list_roles_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<RoleRecord>>>> {
    let roles = admin::list_roles(state.store.as_ref()).await?;
    Ok(Json(ApiResponse::list(roles)))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<RoleRecord>>> {
    let role = admin::get_role(state.store.as_ref(), &id).await?;
    Ok(Json(ApiResponse::ok(role)))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateRoleRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RoleRecord>>)> {
    let role = admin::create_role(state.store.as_ref(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(role).with_message("Role created")),
    ))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<RoleRecord>>> {
    let role = admin::update_role(state.store.as_ref(), &id, body).await?;
    Ok(Json(ApiResponse::ok(role)))
}

/// `DELETE /api/admin/roles/{id}`. Refused while any user holds the role.
pub async fn delete_role_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    admin::delete_role(state.store.as_ref(), &id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Role deleted")))
}

// =============================================================================
// Directories
// =============================================================================

pub async fn list_doctors_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let rows = admin::list_profiles(state.store.as_ref(), ProfileKind::Doctor).await?;
    Ok(Json(ApiResponse::list(rows)))
}

pub async fn get_doctor_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let row = admin::get_profile(state.store.as_ref(), ProfileKind::Doctor, &id).await?;
    Ok(Json(ApiResponse::ok(row)))
}

pub async fn list_health_advisors_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let rows = admin::list_profiles(state.store.as_ref(), ProfileKind::HealthAdvisor).await?;
    Ok(Json(ApiResponse::list(rows)))
}

pub async fn get_health_advisor_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let row = admin::get_profile(state.store.as_ref(), ProfileKind::HealthAdvisor, &id).await?;
    Ok(Json(ApiResponse::ok(row)))
}

pub async fn list_patients_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let rows = admin::list_profiles(state.store.as_ref(), ProfileKind::Patient).await?;
    Ok(Json(ApiResponse::list(rows)))
}

/// `GET /api/admin/patients/{id}` with the patient's clinical history.
pub async fn get_patient_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<PatientDetail>>> {
    let detail = admin::patient_detail(state.store.as_ref(), &id).await?;
    Ok(Json(ApiResponse::ok(detail)))
}
