//! Liveness endpoint.

use axum::Json;
use axum::extract::State;
use medora_core::store::Store;

use crate::AppState;
use crate::models::HealthResponse;

/// `GET /api/health`. Always 200; `storeConnected` reports the store probe.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: medora_core::version(),
        store_connected: state.store.ping().await,
    })
}
