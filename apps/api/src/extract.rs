//! Request extractors whose rejections use the API error envelope.

use axum::extract::FromRequest;

use crate::errors::AppError;

/// `axum::Json` with malformed bodies, wrong field types and a missing
/// content type reported as [`AppError::Validation`] (400).
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
