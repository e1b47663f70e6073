//! Application error types.
//!
//! The single place where failure kinds become HTTP statuses. Every error
//! body is `{ "message": ... }`; internal detail only reaches the logs.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use medora_core::access::AccessError;
use medora_core::auth::AuthError;
use medora_core::store::StoreError;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

pub const MSG_LOGIN_REQUIRED: &str = "Login required";
pub const MSG_PERMISSION_DENIED: &str = "Permission denied";
pub const MSG_PASSWORD_REQUIRED: &str = "Password setup required";
pub const MSG_SERVER_ERROR: &str = "Server error";

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness or reference conflict. Reported as 400.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The reason is logged, never returned.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Password-less account that has not completed the set-password step.
    #[error("Password setup required")]
    PasswordRequired,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(m) => {
                debug!(message = %m, "validation failed");
                (StatusCode::BAD_REQUEST, m)
            }
            AppError::Conflict(m) => {
                debug!(message = %m, "conflict");
                (StatusCode::BAD_REQUEST, m)
            }
            AppError::NotFound(m) => {
                debug!(message = %m, "not found");
                (StatusCode::NOT_FOUND, m)
            }
            AppError::Unauthorized(m) => {
                debug!(message = %m, "not authenticated");
                (StatusCode::UNAUTHORIZED, m)
            }
            AppError::Forbidden(reason) => {
                info!(%reason, "permission denied");
                (StatusCode::FORBIDDEN, MSG_PERMISSION_DENIED.to_string())
            }
            AppError::PasswordRequired => {
                debug!("password setup required");
                (StatusCode::FORBIDDEN, MSG_PASSWORD_REQUIRED.to_string())
            }
            AppError::Internal(detail) => {
                error!(%detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_SERVER_ERROR.to_string())
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Db(e) => AppError::Internal(format!("database: {e}")),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::InvalidToken(_) => AppError::Unauthorized("Invalid refresh token".into()),
            AuthError::NotAuthenticated(_) => AppError::Unauthorized(MSG_LOGIN_REQUIRED.into()),
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Config(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::NotAuthenticated => AppError::Unauthorized(MSG_LOGIN_REQUIRED.into()),
            AccessError::NotAuthorized(reason) => AppError::Forbidden(reason),
            AccessError::NotFound(msg) => AppError::NotFound(msg),
            AccessError::Validation(msg) => AppError::Validation(msg),
            AccessError::Store(e) => AppError::from(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn forbidden_never_leaks_the_reason() {
        let (status, body) = body_of(AppError::Forbidden("doctor d1 does not own a1".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, serde_json::json!({ "message": "Permission denied" }));
    }

    #[tokio::test]
    async fn internal_errors_are_generic() {
        let (status, body) = body_of(AppError::Internal("connection refused".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server error");
    }

    #[tokio::test]
    async fn conflicts_are_bad_requests() {
        let err = AppError::from(StoreError::Conflict("Role with this name already exists".into()));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Role with this name already exists");
    }

    #[test]
    fn access_errors_map_by_kind() {
        assert!(matches!(
            AppError::from(AccessError::NotAuthenticated),
            AppError::Unauthorized(_)
        ));
        assert!(matches!(
            AppError::from(AccessError::NotAuthorized("x".into())),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            AppError::from(AuthError::NotAuthenticated("expired".into())),
            AppError::Unauthorized(m) if m == MSG_LOGIN_REQUIRED
        ));
    }
}
