use axum::{routing::get, Router};

use crate::auth::AuthenticatedUser;

/// GET /protected - only reachable with a signed-in session
async fn protected(AuthenticatedUser(user): AuthenticatedUser) -> String {
    format!("Welcome {} to the protected route!", user.email)
}

pub fn router() -> Router {
    Router::new().route("/protected", get(protected))
}
