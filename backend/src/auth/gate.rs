//! Session gate for protected routes.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use super::{UserClaims, UserSession};

/// Denied access to a gated route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

pub struct SessionGate;

impl SessionGate {
    /// Decide whether the session holder may access `path`, and record the
    /// decision in the audit log.
    pub fn admit(user: Option<UserClaims>, path: &str) -> Result<UserClaims, Unauthorized> {
        let timestamp = Utc::now().to_rfc3339();
        match user {
            Some(user) => {
                tracing::info!(
                    user_id = %user.sub,
                    email = %user.email,
                    path = %path,
                    timestamp = %timestamp,
                    "[ACCESS] protected route accessed"
                );
                Ok(user)
            }
            None => {
                tracing::warn!(
                    path = %path,
                    timestamp = %timestamp,
                    "[UNAUTHORIZED] attempt to access protected route"
                );
                Err(Unauthorized)
            }
        }
    }
}

/// Extractor that only succeeds for signed-in users. Handlers taking it are
/// never called for anonymous requests; those get `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = UserSession::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        // A record that no longer deserializes counts as no session.
        let user = session.user().await.unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable session user: {}", e);
            None
        });

        SessionGate::admit(user, parts.uri.path())
            .map(Self)
            .map_err(IntoResponse::into_response)
    }
}
