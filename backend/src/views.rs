//! HTML views rendered with handlebars.

use handlebars::{Handlebars, RenderError, TemplateError};
use serde_json::json;

use crate::auth::UserClaims;

const HOME_TEMPLATE: &str = "home";

/// Compiled templates, built once at startup and shared by all requests.
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(HOME_TEMPLATE, include_str!("../templates/home.hbs"))?;
        Ok(Self { registry })
    }

    /// Home page for a signed-in user or an anonymous visitor.
    pub fn home(&self, user: Option<&UserClaims>) -> Result<String, RenderError> {
        let data = match user {
            Some(user) => json!({
                "user": true,
                "display_name": user.display_name(),
                "user_json": serde_json::to_string_pretty(user).unwrap_or_default(),
            }),
            None => json!({ "user": false }),
        };
        self.registry.render(HOME_TEMPLATE, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_for_anonymous_links_to_login() {
        let html = Views::new().unwrap().home(None).unwrap();
        assert!(html.contains("Welcome Guest"));
        assert!(html.contains("href=\"/login\""));
        assert!(!html.contains("href=\"/logout\""));
    }

    #[test]
    fn test_home_for_user_shows_claims() {
        let user = UserClaims::new("auth0|99", "linus@example.com").with_name("Linus");
        let html = Views::new().unwrap().home(Some(&user)).unwrap();
        assert!(html.contains("Welcome Linus!"));
        assert!(html.contains("href=\"/logout\""));
        assert!(html.contains("auth0|99"));
        assert!(html.contains("linus@example.com"));
    }

    #[test]
    fn test_home_shows_extra_provider_claims() {
        let user =
            UserClaims::new("auth0|99", "linus@example.com").with_claim("nickname", "torvalds");
        let html = Views::new().unwrap().home(Some(&user)).unwrap();
        assert!(html.contains("&quot;nickname&quot;: &quot;torvalds&quot;"));
    }

    #[test]
    fn test_home_escapes_claims() {
        let user = UserClaims::new("auth0|1", "x@example.com").with_name("<script>");
        let html = Views::new().unwrap().home(Some(&user)).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
