//! Extractors whose rejections use the API error shape.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` with rejections reported as `{ "message": ... }` 400s.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
