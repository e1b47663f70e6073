//! Prescription handlers.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use medora_core::models::clinical::Prescription;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, CreatePrescriptionRequest, UpdatePrescriptionRequest};
use crate::services::clinical;

pub async fn list_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<Vec<Prescription>>>> {
    let rows = clinical::list_prescriptions(state.store.as_ref(), &principal).await?;
    Ok(Json(ApiResponse::list(rows)))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Prescription>>> {
    let row = clinical::get_prescription(state.store.as_ref(), &principal, &id).await?;
    Ok(Json(ApiResponse::ok(row)))
}

/// `POST /api/prescriptions`. Doctors write for themselves only.
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<CreatePrescriptionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Prescription>>)> {
    let row = clinical::create_prescription(state.store.as_ref(), &principal, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(row).with_message("Prescription created")),
    ))
}

pub async fn update_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdatePrescriptionRequest>,
) -> AppResult<Json<ApiResponse<Prescription>>> {
    let row = clinical::update_prescription(state.store.as_ref(), &principal, &id, body).await?;
    Ok(Json(ApiResponse::ok(row)))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    clinical::delete_prescription(state.store.as_ref(), &principal, &id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Prescription deleted")))
}
