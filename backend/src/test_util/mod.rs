use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use url::Url;

use crate::auth::identity::build_logout_url;
use crate::auth::{AuthorizationRedirect, IdentityError, IdentityProvider, PendingLogin, UserClaims};
use crate::config::{AppConfig, Config, LoggingConfig, OidcConfig, ServerConfig, SessionConfig};
use crate::views::Views;
use crate::AppState;

pub const TEST_AUTHORIZE_URL: &str = "https://idp.test/authorize";
pub const TEST_LOGOUT_URL: &str = "https://idp.test/v2/logout";
pub const TEST_STATE: &str = "test-state";
pub const TEST_CODE: &str = "test-code";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        app: AppConfig {
            base_url: Url::parse("http://localhost:3000/").unwrap(),
        },
        oidc: OidcConfig {
            domain: "idp.test".to_string(),
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            issuer_url: None,
            logout_url: Some(TEST_LOGOUT_URL.to_string()),
            scopes: vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
        },
        session: SessionConfig {
            secret_key: "a-test-secret-that-is-long-enough-to-sign".to_string(),
            cookie_name: "session".to_string(),
            secure: false,
            inactivity_minutes: None,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

/// Identity provider that accepts a single code and returns fixed claims.
pub struct StaticIdentityProvider {
    pub claims: UserClaims,
    pub code: String,
    pub client_id: String,
}

impl StaticIdentityProvider {
    pub fn new(claims: UserClaims) -> Self {
        Self {
            claims,
            code: TEST_CODE.to_string(),
            client_id: "test-client".to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn authorization_redirect(
        &self,
        callback_url: &Url,
    ) -> Result<AuthorizationRedirect, IdentityError> {
        let mut url = Url::parse(TEST_AUTHORIZE_URL)
            .map_err(|e| IdentityError::Configuration(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", callback_url.as_str())
            .append_pair("state", TEST_STATE);

        Ok(AuthorizationRedirect {
            url,
            pending: PendingLogin {
                csrf_state: TEST_STATE.to_string(),
                nonce: "test-nonce".to_string(),
                pkce_verifier: "test-verifier".to_string(),
                redirect_uri: callback_url.to_string(),
            },
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        _pending: PendingLogin,
    ) -> Result<UserClaims, IdentityError> {
        if code == self.code {
            Ok(self.claims.clone())
        } else {
            Err(IdentityError::Exchange("invalid_grant".to_string()))
        }
    }

    fn logout_url(&self, return_to: &Url) -> Result<Url, IdentityError> {
        build_logout_url(TEST_LOGOUT_URL, return_to, &self.client_id)
    }
}

pub fn test_claims() -> UserClaims {
    UserClaims::new("auth0|test-user", "user@example.com")
        .with_name("Test User")
        .with_claim("nickname", "tester")
}

pub fn create_test_state(identity: impl IdentityProvider + 'static) -> Arc<AppState> {
    Arc::new(AppState {
        config: test_config(),
        identity: Arc::new(identity),
        views: Views::new().expect("home template compiles"),
    })
}

/// Log output captured in memory, for asserting on audit entries.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Send this thread's log events here until the guard is dropped.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
