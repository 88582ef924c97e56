//! Identity provider abstraction.
//!
//! The app never speaks the OIDC protocol itself. It asks an
//! `IdentityProvider` for the authorization redirect, hands it back the
//! code from the callback, and gets verified `UserClaims` in return.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::UserClaims;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid provider configuration: {0}")]
    Configuration(String),
    #[error("Provider discovery failed: {0}")]
    Discovery(String),
    #[error("No login in progress for this session")]
    NoPendingLogin,
    #[error("Provider returned error {error}: {description}")]
    Provider { error: String, description: String },
    #[error("Callback is missing the authorization code")]
    MissingCode,
    #[error("Callback state does not match the login request")]
    StateMismatch,
    #[error("Code exchange failed: {0}")]
    Exchange(String),
    #[error("ID token rejected: {0}")]
    InvalidIdToken(String),
    #[error("ID token is missing the {0} claim")]
    MissingClaim(&'static str),
}

/// Secrets generated for one authorization request. They live in the
/// session between `/login` and `/callback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub csrf_state: String,
    pub nonce: String,
    pub pkce_verifier: String,
    pub redirect_uri: String,
}

/// Where to send the browser, and what to remember until it comes back.
#[derive(Debug, Clone)]
pub struct AuthorizationRedirect {
    pub url: Url,
    pub pending: PendingLogin,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the provider authorization URL for a login that returns to
    /// `callback_url`.
    fn authorization_redirect(&self, callback_url: &Url)
        -> Result<AuthorizationRedirect, IdentityError>;

    /// Exchange an authorization code for verified claims.
    async fn exchange_code(
        &self,
        code: &str,
        pending: PendingLogin,
    ) -> Result<UserClaims, IdentityError>;

    /// Provider logout URL that sends the browser back to `return_to`.
    fn logout_url(&self, return_to: &Url) -> Result<Url, IdentityError>;
}

/// Append the `returnTo`/`client_id` pair expected by the provider's
/// logout endpoint.
pub fn build_logout_url(
    endpoint: &str,
    return_to: &Url,
    client_id: &str,
) -> Result<Url, IdentityError> {
    let mut url = Url::parse(endpoint).map_err(|e| {
        IdentityError::Configuration(format!("Invalid logout URL {}: {}", endpoint, e))
    })?;
    url.query_pairs_mut()
        .append_pair("returnTo", return_to.as_str())
        .append_pair("client_id", client_id);
    Ok(url)
}
