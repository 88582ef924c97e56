use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Authenticated user information taken from the verified ID token.
///
/// A value of this type is always complete: `sub` and `email` are required
/// both when built by the identity client and when read back from the
/// session store. Any other claims the provider sent (`nickname`,
/// `updated_at`, custom ones) are kept as-is in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserClaims {
    pub fn new(sub: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: email.into(),
            email_verified: None,
            name: None,
            picture: None,
            extra: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Name to greet the user with, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_name_prefers_name() {
        let claims = UserClaims::new("auth0|123", "ada@example.com").with_name("Ada");
        assert_eq!(claims.display_name(), "Ada");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let claims = UserClaims::new("auth0|123", "ada@example.com");
        assert_eq!(claims.display_name(), "ada@example.com");
    }

    #[test]
    fn test_optional_fields_omitted_when_absent() {
        let claims = UserClaims::new("auth0|123", "ada@example.com");
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value, json!({"sub": "auth0|123", "email": "ada@example.com"}));
    }

    #[test]
    fn test_partial_record_is_rejected() {
        let result: Result<UserClaims, _> = serde_json::from_value(json!({"sub": "auth0|123"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_extra_claims_are_kept() {
        let record = json!({
            "sub": "auth0|123",
            "email": "ada@example.com",
            "nickname": "ada",
            "updated_at": "2024-05-01T10:00:00.000Z"
        });

        let claims: UserClaims = serde_json::from_value(record.clone()).unwrap();

        assert_eq!(
            claims,
            UserClaims::new("auth0|123", "ada@example.com")
                .with_claim("nickname", "ada")
                .with_claim("updated_at", "2024-05-01T10:00:00.000Z")
        );
        assert_eq!(serde_json::to_value(&claims).unwrap(), record);
    }
}
