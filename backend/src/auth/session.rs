//! Per-request session context.
//!
//! `UserSession` wraps the `tower_sessions::Session` of the current request
//! and is the only code that touches session keys. The backing store is
//! whatever `SessionStore` the session layer was built with.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use sha2::{Digest, Sha512};
use time::Duration;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::session::Error as SessionError;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use super::identity::PendingLogin;
use super::UserClaims;
use crate::config::SessionConfig;

/// Session key holding the signed-in user's claims.
pub const USER_KEY: &str = "user";
/// Session key holding the in-flight authorization request.
pub const PENDING_LOGIN_KEY: &str = "oidc_pending";

#[derive(Debug, Clone)]
pub struct UserSession {
    session: Session,
}

impl UserSession {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Claims of the signed-in user, if any.
    pub async fn user(&self) -> Result<Option<UserClaims>, SessionError> {
        self.session.get(USER_KEY).await
    }

    /// Store the claims returned by the identity provider. The session id is
    /// rotated so an id planted before login cannot be reused after it.
    pub async fn sign_in(&self, claims: &UserClaims) -> Result<(), SessionError> {
        self.session.cycle_id().await?;
        self.session.insert(USER_KEY, claims).await
    }

    pub async fn begin_login(&self, pending: &PendingLogin) -> Result<(), SessionError> {
        self.session.insert(PENDING_LOGIN_KEY, pending).await
    }

    /// Remove and return the in-flight authorization request. A pending
    /// login can only be consumed once: the removal is written to the store
    /// right away, because the session layer discards changes made by a
    /// request that ends in a server error.
    pub async fn take_pending_login(&self) -> Result<Option<PendingLogin>, SessionError> {
        let pending = self.session.remove(PENDING_LOGIN_KEY).await?;
        if pending.is_some() {
            self.session.save().await?;
        }
        Ok(pending)
    }

    /// Drop all session data and delete the session from the store.
    pub async fn clear(&self) -> Result<(), SessionError> {
        self.session.flush().await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for UserSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self::new)
    }
}

/// Derive the cookie signing key from the configured secret. `Key` needs 64
/// bytes; hashing lets the secret be any length.
pub fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Build the session layer over any session store.
pub fn session_layer<Store>(
    store: Store,
    config: &SessionConfig,
) -> SessionManagerLayer<Store, SignedCookie>
where
    Store: SessionStore + Clone,
{
    let expiry = match config.inactivity_minutes {
        Some(minutes) => Expiry::OnInactivity(Duration::minutes(minutes)),
        None => Expiry::OnSessionEnd,
    };

    // Lax so the cookie comes back on the provider's redirect to /callback.
    SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_secure(config.secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(expiry)
        .with_signed(cookie_key(&config.secret_key))
}
