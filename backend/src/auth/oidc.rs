//! OpenID Connect client backed by the `openidconnect` crate.
//!
//! Discovery, PKCE, token exchange and ID token verification all happen
//! inside the library; this type only wires configuration into it and
//! maps verified claims into `UserClaims`.

use std::borrow::Cow;

use async_trait::async_trait;
use openidconnect::core::{
    CoreAuthDisplay, CoreAuthPrompt, CoreAuthenticationFlow, CoreErrorResponseType,
    CoreGenderClaim, CoreJsonWebKey, CoreJweContentEncryptionAlgorithm, CoreJwsSigningAlgorithm,
    CoreProviderMetadata, CoreRevocableToken, CoreRevocationErrorResponse,
    CoreTokenIntrospectionResponse, CoreTokenType,
};
use openidconnect::{
    AdditionalClaims, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
    EmptyExtraTokenFields, EndpointMaybeSet, EndpointNotSet, EndpointSet, IdTokenClaims,
    IdTokenFields, IssuerUrl, Nonce, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    StandardErrorResponse, StandardTokenResponse, TokenResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::identity::{
    build_logout_url, AuthorizationRedirect, IdentityError, IdentityProvider, PendingLogin,
};
use super::UserClaims;
use crate::config::OidcConfig;

/// Every ID token claim not consumed by the library's own fields, verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ProfileClaims {
    #[serde(flatten)]
    claims: Map<String, Value>,
}

impl AdditionalClaims for ProfileClaims {}

type ProfileIdTokenClaims = IdTokenClaims<ProfileClaims, CoreGenderClaim>;

type ProfileTokenResponse = StandardTokenResponse<
    IdTokenFields<
        ProfileClaims,
        EmptyExtraTokenFields,
        CoreGenderClaim,
        CoreJweContentEncryptionAlgorithm,
        CoreJwsSigningAlgorithm,
    >,
    CoreTokenType,
>;

/// `CoreClient` with `ProfileClaims`, as produced by provider discovery:
/// authorization endpoint known, token and userinfo endpoints present only if
/// the provider advertises them.
type DiscoveredClient = Client<
    ProfileClaims,
    CoreAuthDisplay,
    CoreGenderClaim,
    CoreJweContentEncryptionAlgorithm,
    CoreJsonWebKey,
    CoreAuthPrompt,
    StandardErrorResponse<CoreErrorResponseType>,
    ProfileTokenResponse,
    CoreTokenIntrospectionResponse,
    CoreRevocableToken,
    CoreRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

/// Claims stored in dedicated `UserClaims` fields rather than in `extra`.
const MAPPED_CLAIMS: [&str; 5] = ["sub", "email", "email_verified", "name", "picture"];

/// Build the session user from verified ID token claims.
fn user_claims(claims: &ProfileIdTokenClaims) -> Result<UserClaims, IdentityError> {
    let email = claims
        .email()
        .map(|email| email.as_str().to_string())
        .ok_or(IdentityError::MissingClaim("email"))?;

    let extra = claims
        .additional_claims()
        .claims
        .iter()
        .filter(|(name, _)| !MAPPED_CLAIMS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    Ok(UserClaims {
        sub: claims.subject().as_str().to_string(),
        email,
        email_verified: claims.email_verified(),
        name: claims
            .name()
            .and_then(|name| name.get(None))
            .map(|name| name.as_str().to_string()),
        picture: claims
            .picture()
            .and_then(|picture| picture.get(None))
            .map(|picture| picture.as_str().to_string()),
        extra,
    })
}

pub struct OidcClient {
    client: DiscoveredClient,
    http_client: reqwest::Client,
    client_id: String,
    scopes: Vec<String>,
    logout_endpoint: String,
}

impl OidcClient {
    /// Fetch the provider's discovery document and signing keys.
    pub async fn discover(config: &OidcConfig) -> Result<Self, IdentityError> {
        // Provider responses must not redirect us elsewhere.
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| IdentityError::Configuration(e.to_string()))?;

        let issuer = config.issuer();
        let issuer_url = IssuerUrl::new(issuer.clone()).map_err(|e| {
            IdentityError::Configuration(format!("Invalid issuer URL {}: {}", issuer, e))
        })?;

        tracing::info!("Fetching OIDC discovery document from {}", issuer);
        let metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
            .await
            .map_err(|e| IdentityError::Discovery(e.to_string()))?;
        tracing::info!(
            "Discovered OIDC provider, {} signing keys",
            metadata.jwks().keys().len()
        );

        let client: DiscoveredClient = Client::from_provider_metadata(
            metadata,
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
        );

        Ok(Self {
            client,
            http_client,
            client_id: config.client_id.clone(),
            scopes: config.scopes.clone(),
            logout_endpoint: config.logout_endpoint(),
        })
    }
}

#[async_trait]
impl IdentityProvider for OidcClient {
    fn authorization_redirect(
        &self,
        callback_url: &Url,
    ) -> Result<AuthorizationRedirect, IdentityError> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_redirect_uri(Cow::Owned(RedirectUrl::from_url(callback_url.clone())))
            .set_pkce_challenge(pkce_challenge);

        // `openid` is always sent by the library.
        for scope in self.scopes.iter().filter(|s| s.as_str() != "openid") {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (url, csrf_state, nonce) = request.url();

        Ok(AuthorizationRedirect {
            url,
            pending: PendingLogin {
                csrf_state: csrf_state.secret().clone(),
                nonce: nonce.secret().clone(),
                pkce_verifier: pkce_verifier.secret().clone(),
                redirect_uri: callback_url.to_string(),
            },
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        pending: PendingLogin,
    ) -> Result<UserClaims, IdentityError> {
        let redirect_url = RedirectUrl::new(pending.redirect_uri).map_err(|e| {
            IdentityError::Configuration(format!("Invalid redirect URI: {}", e))
        })?;

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| IdentityError::Configuration(e.to_string()))?
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier))
            .set_redirect_uri(Cow::Owned(redirect_url))
            .request_async(&self.http_client)
            .await
            .map_err(|e| IdentityError::Exchange(e.to_string()))?;

        let id_token = token_response.id_token().ok_or_else(|| {
            IdentityError::InvalidIdToken("token response has no id_token".to_string())
        })?;
        let verifier = self.client.id_token_verifier();
        let nonce = Nonce::new(pending.nonce);
        let claims = id_token
            .claims(&verifier, &nonce)
            .map_err(|e| IdentityError::InvalidIdToken(e.to_string()))?;

        user_claims(claims)
    }

    fn logout_url(&self, return_to: &Url) -> Result<Url, IdentityError> {
        build_logout_url(&self.logout_endpoint, return_to, &self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::test_config;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_provider() -> MockServer {
        let server = MockServer::start().await;
        let issuer = server.uri();

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": issuer,
                "authorization_endpoint": format!("{}/authorize", issuer),
                "token_endpoint": format!("{}/oauth/token", issuer),
                "userinfo_endpoint": format!("{}/userinfo", issuer),
                "jwks_uri": format!("{}/.well-known/jwks.json", issuer),
                "response_types_supported": ["code"],
                "subject_types_supported": ["public"],
                "id_token_signing_alg_values_supported": ["RS256"],
                "scopes_supported": ["openid", "profile", "email"]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [] })))
            .mount(&server)
            .await;

        server
    }

    fn oidc_config(server: &MockServer) -> OidcConfig {
        let mut config = test_config().oidc;
        config.issuer_url = Some(server.uri());
        config.logout_url = Some(format!("{}/v2/logout", server.uri()));
        config
    }

    #[tokio::test]
    async fn test_authorization_redirect_targets_provider() {
        let server = mock_provider().await;
        let client = OidcClient::discover(&oidc_config(&server)).await.unwrap();
        let callback = Url::parse("https://app.example.com/callback").unwrap();

        let redirect = client.authorization_redirect(&callback).unwrap();

        assert!(redirect
            .url
            .as_str()
            .starts_with(&format!("{}/authorize?", server.uri())));
        let query: HashMap<String, String> = redirect.url.query_pairs().into_owned().collect();
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "test-client");
        assert_eq!(query["redirect_uri"], "https://app.example.com/callback");
        assert_eq!(query["state"], redirect.pending.csrf_state);
        assert_eq!(query["nonce"], redirect.pending.nonce);
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["scope"], "openid profile email");
        assert_eq!(redirect.pending.redirect_uri, "https://app.example.com/callback");
    }

    #[tokio::test]
    async fn test_each_redirect_gets_fresh_secrets() {
        let server = mock_provider().await;
        let client = OidcClient::discover(&oidc_config(&server)).await.unwrap();
        let callback = Url::parse("https://app.example.com/callback").unwrap();

        let first = client.authorization_redirect(&callback).unwrap();
        let second = client.authorization_redirect(&callback).unwrap();

        assert_ne!(first.pending.csrf_state, second.pending.csrf_state);
        assert_ne!(first.pending.nonce, second.pending.nonce);
        assert_ne!(first.pending.pkce_verifier, second.pending.pkce_verifier);
    }

    #[tokio::test]
    async fn test_discovery_failure_is_reported() {
        let server = MockServer::start().await;
        let result = OidcClient::discover(&oidc_config(&server)).await;
        assert!(matches!(result, Err(IdentityError::Discovery(_))));
    }

    #[tokio::test]
    async fn test_rejected_code_maps_to_exchange_error() {
        let server = mock_provider().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code"
            })))
            .mount(&server)
            .await;

        let client = OidcClient::discover(&oidc_config(&server)).await.unwrap();
        let callback = Url::parse("https://app.example.com/callback").unwrap();
        let redirect = client.authorization_redirect(&callback).unwrap();

        let result = client.exchange_code("bad-code", redirect.pending).await;
        assert!(matches!(result, Err(IdentityError::Exchange(_))));
    }

    fn id_token_claims(profile: serde_json::Value) -> ProfileIdTokenClaims {
        let mut token = json!({
            "iss": "https://idp.test/",
            "aud": "test-client",
            "exp": 1_900_000_000,
            "iat": 1_700_000_000,
            "sub": "auth0|42"
        });
        if let (Some(token), Some(profile)) = (token.as_object_mut(), profile.as_object()) {
            token.extend(profile.clone());
        }
        serde_json::from_value(token).unwrap()
    }

    #[test]
    fn test_user_claims_keep_provider_profile() {
        let claims = id_token_claims(json!({
            "email": "ada@example.com",
            "email_verified": true,
            "name": "Ada",
            "nickname": "ada",
            "org_id": "org_123"
        }));

        let user = user_claims(&claims).unwrap();

        assert_eq!(user.sub, "auth0|42");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.email_verified, Some(true));
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.extra["nickname"], "ada");
        assert_eq!(user.extra["org_id"], "org_123");
        for mapped in MAPPED_CLAIMS {
            assert!(!user.extra.contains_key(mapped), "{} duplicated", mapped);
        }
    }

    #[test]
    fn test_user_claims_require_email() {
        let claims = id_token_claims(json!({ "nickname": "ada" }));
        assert!(matches!(
            user_claims(&claims),
            Err(IdentityError::MissingClaim("email"))
        ));
    }

    #[tokio::test]
    async fn test_logout_url_uses_configured_endpoint() {
        let server = mock_provider().await;
        let client = OidcClient::discover(&oidc_config(&server)).await.unwrap();
        let home = Url::parse("https://app.example.com/").unwrap();

        let url = client.logout_url(&home).unwrap();

        assert!(url.as_str().starts_with(&format!("{}/v2/logout?", server.uri())));
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(query["returnTo"], "https://app.example.com/");
        assert_eq!(query["client_id"], "test-client");
    }
}
