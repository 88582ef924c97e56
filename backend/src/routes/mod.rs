pub mod auth;
pub mod health;
pub mod home;
pub mod protected;

use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::AppState;

/// All application routes, without the session layer.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(home::router(state.clone()))
        .merge(auth::router(state))
        .merge(protected::router())
}

/// 302 Found to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
