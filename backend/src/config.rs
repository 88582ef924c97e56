//! Configuration for the login backend.

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use url::Url;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub app: AppConfig,
    pub oidc: OidcConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Public-facing application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// URL the browser uses to reach this app. The OIDC callback and the
    /// logout return URL are both derived from it.
    pub base_url: Url,
}

impl AppConfig {
    /// Fixed callback URL registered with the identity provider.
    pub fn callback_url(&self) -> Result<Url, url::ParseError> {
        self.base_url.join("callback")
    }

    /// Home page URL, used as the provider's post-logout return target.
    pub fn home_url(&self) -> Url {
        self.base_url.clone()
    }
}

/// Identity provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcConfig {
    /// Provider tenant domain (e.g. `example.eu.auth0.com`).
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Overrides the issuer derived from `domain`.
    #[serde(default)]
    pub issuer_url: Option<String>,
    /// Overrides the logout endpoint derived from `domain`.
    #[serde(default)]
    pub logout_url: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl OidcConfig {
    pub fn issuer(&self) -> String {
        self.issuer_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/", self.domain))
    }

    pub fn logout_endpoint(&self) -> String {
        self.logout_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/v2/logout", self.domain))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret used to sign the session cookie.
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Mark the cookie `Secure` (HTTPS only).
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Expire idle sessions after this many minutes. Unset keeps the
    /// session for the lifetime of the browser session.
    #[serde(default)]
    pub inactivity_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid setting {0}: {1}")]
    Invalid(&'static str, String),
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "profile".to_string(), "email".to_string()]
}
fn default_cookie_name() -> String {
    "session".to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. `APP_SECRET_KEY`, `AUTH0_DOMAIN`, `AUTH0_CLIENT_ID`, `AUTH0_CLIENT_SECRET`
    /// 2. Environment variables (APP__SECTION__KEY format)
    /// 3. config.toml file (if present)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("session.secret_key", std::env::var("APP_SECRET_KEY").ok())?
            .set_override_option("oidc.domain", std::env::var("AUTH0_DOMAIN").ok())?
            .set_override_option("oidc.client_id", std::env::var("AUTH0_CLIENT_ID").ok())?
            .set_override_option(
                "oidc.client_secret",
                std::env::var("AUTH0_CLIENT_SECRET").ok(),
            )?
            .build()?;

        let mut config: Config = loader.try_deserialize()?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Ensure `app.base_url` ends with `/` so relative joins stay under it.
    pub fn normalize(&mut self) {
        let path = self.app.base_url.path();
        if !path.ends_with('/') {
            let path = format!("{}/", path);
            self.app.base_url.set_path(&path);
        }
    }

    /// Reject configurations the app cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.secret_key.is_empty() {
            return Err(ConfigError::Missing("session.secret_key"));
        }
        if self.oidc.client_id.is_empty() {
            return Err(ConfigError::Missing("oidc.client_id"));
        }
        if self.oidc.client_secret.is_empty() {
            return Err(ConfigError::Missing("oidc.client_secret"));
        }
        if self.oidc.domain.is_empty() && self.oidc.issuer_url.is_none() {
            return Err(ConfigError::Missing("oidc.domain"));
        }
        if !self.oidc.scopes.iter().any(|s| s == "openid") {
            return Err(ConfigError::Invalid(
                "oidc.scopes",
                "must include \"openid\"".to_string(),
            ));
        }
        if let Some(minutes) = self.session.inactivity_minutes {
            if minutes <= 0 {
                return Err(ConfigError::Invalid(
                    "session.inactivity_minutes",
                    format!("expected a positive number, got {}", minutes),
                ));
            }
        }
        if self.session.secret_key.len() < 32 {
            tracing::warn!("session.secret_key is shorter than 32 bytes");
        }
        Ok(())
    }
}
