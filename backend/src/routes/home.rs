use std::sync::Arc;

use axum::{extract::State, response::Html, routing::get, Router};

use crate::auth::UserSession;
use crate::error::Result;
use crate::AppState;

/// GET / - landing page reflecting the session user
async fn home(State(state): State<Arc<AppState>>, session: UserSession) -> Result<Html<String>> {
    let user = session.user().await?;
    let page = state.views.home(user.as_ref())?;
    Ok(Html(page))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/", get(home)).with_state(state)
}
