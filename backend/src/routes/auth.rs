//! Login, callback and logout.
//!
//! Thin orchestration around the identity provider: everything protocol
//! related happens behind `IdentityProvider`, these handlers only move
//! state in and out of the session.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;

use super::found;
use crate::auth::{IdentityError, UserSession};
use crate::error::Result;
use crate::AppState;

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /login - redirect to the provider's authorization endpoint
async fn login(State(state): State<Arc<AppState>>, session: UserSession) -> Result<Response> {
    let callback_url = state.config.app.callback_url()?;
    let redirect = state.identity.authorization_redirect(&callback_url)?;
    session.begin_login(&redirect.pending).await?;

    tracing::debug!("Redirecting to identity provider, callback {}", callback_url);
    Ok(found(redirect.url.as_str()))
}

/// GET /callback - finish the code exchange and sign the user in
async fn callback(
    State(state): State<Arc<AppState>>,
    session: UserSession,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    // Consumed up front so a failed callback cannot be replayed.
    let pending = session
        .take_pending_login()
        .await?
        .ok_or(IdentityError::NoPendingLogin)?;

    if let Some(error) = params.error {
        return Err(IdentityError::Provider {
            error,
            description: params.error_description.unwrap_or_default(),
        }
        .into());
    }
    let code = params.code.ok_or(IdentityError::MissingCode)?;
    if params.state.as_deref() != Some(pending.csrf_state.as_str()) {
        return Err(IdentityError::StateMismatch.into());
    }

    let user = state.identity.exchange_code(&code, pending).await?;
    session.sign_in(&user).await?;

    tracing::info!(
        user_id = %user.sub,
        email = %user.email,
        timestamp = %Utc::now().to_rfc3339(),
        "[LOGIN] user signed in"
    );

    Ok(found("/"))
}

/// GET /logout - clear the session and log out at the provider too
async fn logout(State(state): State<Arc<AppState>>, session: UserSession) -> Result<Response> {
    session.clear().await?;
    let url = state.identity.logout_url(&state.config.app.home_url())?;

    tracing::debug!("Session cleared, redirecting to provider logout");
    Ok(found(url.as_str()))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .with_state(state)
}
