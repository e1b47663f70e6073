//! Appointment handlers.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use medora_core::models::clinical::Appointment;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::services::clinical;

/// `GET /api/appointments`: the caller's appointments; everything for admins.
pub async fn list_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<Vec<Appointment>>>> {
    let rows = clinical::list_appointments(state.store.as_ref(), &principal).await?;
    Ok(Json(ApiResponse::list(rows)))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Appointment>>> {
    let row = clinical::get_appointment(state.store.as_ref(), &principal, &id).await?;
    Ok(Json(ApiResponse::ok(row)))
}

pub async fn create_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<CreateAppointmentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Appointment>>)> {
    let row = clinical::create_appointment(state.store.as_ref(), &principal, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(row).with_message("Appointment booked")),
    ))
}

/// `PATCH /api/appointments/{id}`: status changes and (admin) rescheduling.
/// A patient's empty object (`{}`) cancels.
pub async fn update_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateAppointmentRequest>,
) -> AppResult<Json<ApiResponse<Appointment>>> {
    let row = clinical::update_appointment(state.store.as_ref(), &principal, &id, body).await?;
    Ok(Json(ApiResponse::ok(row)))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    clinical::delete_appointment(state.store.as_ref(), &principal, &id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Appointment deleted")))
}
