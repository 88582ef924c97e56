//! Request-level error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::IdentityError;

/// Failures that abort a request. None of them are recoverable from the
/// browser's point of view, so all map to a plain 500.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Template error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
