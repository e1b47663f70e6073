//! Consultation handlers.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use medora_core::models::clinical::Consultation;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, CreateConsultationRequest, UpdateConsultationRequest};
use crate::services::clinical;

pub async fn list_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<Vec<Consultation>>>> {
    let rows = clinical::list_consultations(state.store.as_ref(), &principal).await?;
    Ok(Json(ApiResponse::list(rows)))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Consultation>>> {
    let row = clinical::get_consultation(state.store.as_ref(), &principal, &id).await?;
    Ok(Json(ApiResponse::ok(row)))
}

/// `POST /api/consultations`. Advisors are stamped as the owner; admins name one.
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<CreateConsultationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Consultation>>)> {
    let row = clinical::create_consultation(state.store.as_ref(), &principal, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(row).with_message("Consultation created")),
    ))
}

pub async fn update_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateConsultationRequest>,
) -> AppResult<Json<ApiResponse<Consultation>>> {
    let row = clinical::update_consultation(state.store.as_ref(), &principal, &id, body).await?;
    Ok(Json(ApiResponse::ok(row)))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    clinical::delete_consultation(state.store.as_ref(), &principal, &id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Consultation deleted")))
}
