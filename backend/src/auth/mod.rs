//! Authentication: identity provider client, session context and the
//! gate protecting signed-in-only routes.

mod claims;
mod gate;
pub mod identity;
mod oidc;
pub mod session;

pub use claims::UserClaims;
pub use gate::{AuthenticatedUser, SessionGate, Unauthorized};
pub use identity::{AuthorizationRedirect, IdentityError, IdentityProvider, PendingLogin};
pub use oidc::OidcClient;
pub use session::{session_layer, UserSession};
