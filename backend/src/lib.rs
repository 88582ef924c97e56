pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod test_util;
pub mod views;

pub use auth::{AuthenticatedUser, IdentityProvider, OidcClient, UserClaims, UserSession};
pub use config::Config;
pub use error::AppError;
pub use views::Views;

use std::sync::Arc;

use axum::{middleware, Router};
use tower_sessions::SessionStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Identity provider performing the OIDC handshake.
    pub identity: Arc<dyn IdentityProvider>,
    pub views: Views,
}

/// Build the full application over the given session store.
pub fn app<Store>(state: Arc<AppState>, store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    let sessions = auth::session_layer(store, &state.config.session);

    routes::router(state)
        .layer(sessions)
        .layer(middleware::from_fn(logging::request_logger))
}
