//! Health-advisor workspace handlers. Mounted behind the advisor role guard.

use axum::Json;
use axum::extract::{Extension, State};
use medora_core::models::role::ProfileKind;
use medora_core::models::user::Profile;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AdvisorDashboard, ApiResponse};
use crate::services::admin;

pub async fn dashboard_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<AdvisorDashboard>>> {
    let counts = admin::advisor_dashboard(state.store.as_ref(), &principal).await?;
    Ok(Json(ApiResponse::ok(counts)))
}

pub async fn patients_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let rows = admin::list_profiles(state.store.as_ref(), ProfileKind::Patient).await?;
    Ok(Json(ApiResponse::list(rows)))
}
