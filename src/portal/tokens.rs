//! Endpoint tokens scraped from the login page.
//!
//! The portal has no stable API. Its login page embeds the current login and
//! logout endpoints (and a couple of other per-deployment values) as
//! single-quoted literals inside an inline script, e.g.
//!
//! ```text
//! 'login': '/service/rest/a81f/login',
//! logout : '/service/rest/a81f/logout',
//! urlDone : '/service/secure/overview.jsp',
//! recaptchaSitekey: '6Lc...'
//! ```
//!
//! Each value is required. If one is missing the markup changed in a way this
//! crate does not understand and the run stops.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExtractionError;

/// The named values read from the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenField {
    Login,
    Logout,
    UrlDone,
    RecaptchaSitekey,
}

impl TokenField {
    pub const ALL: [TokenField; 4] = [
        TokenField::Login,
        TokenField::Logout,
        TokenField::UrlDone,
        TokenField::RecaptchaSitekey,
    ];

    /// The script key that precedes the value.
    pub fn key(self) -> &'static str {
        match self {
            TokenField::Login => "login",
            TokenField::Logout => "logout",
            TokenField::UrlDone => "urlDone",
            TokenField::RecaptchaSitekey => "recaptchaSitekey",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            TokenField::Login => &LOGIN_RE,
            TokenField::Logout => &LOGOUT_RE,
            TokenField::UrlDone => &URL_DONE_RE,
            TokenField::RecaptchaSitekey => &RECAPTCHA_RE,
        }
    }

    /// First single-quoted value following this field's key, if any.
    fn find(self, body: &str) -> Option<String> {
        self.pattern()
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl fmt::Display for TokenField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// `login` is quoted in the page; the other keys are bare identifiers.
// `logout` is left unanchored so both `logout:` and `'logout':` match.
static LOGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'login'\s*:\s*'([^']*)'").expect("valid regex"));
static LOGOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"logout'?\s*:\s*'([^']*)'").expect("valid regex"));
static URL_DONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"urlDone'?\s*:\s*'([^']*)'").expect("valid regex"));
static RECAPTCHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"recaptchaSitekey'?\s*:\s*'([^']*)'").expect("valid regex"));

/// Session-specific values needed to log in and out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTokens {
    pub login_path: String,
    pub logout_path: String,
    pub post_login_redirect: String,
    pub anti_bot_key: String,
}

impl LoginTokens {
    /// Extract all four tokens from the login page body.
    ///
    /// A field that is absent, or present with an empty literal, is reported
    /// as [`ExtractionError::MissingToken`] naming the first such field.
    pub fn extract(body: &str) -> Result<Self, ExtractionError> {
        let require = |field: TokenField| {
            field
                .find(body)
                .filter(|value| !value.is_empty())
                .ok_or(ExtractionError::MissingToken(field))
        };

        let tokens = Self {
            login_path: require(TokenField::Login)?,
            logout_path: require(TokenField::Logout)?,
            post_login_redirect: require(TokenField::UrlDone)?,
            anti_bot_key: require(TokenField::RecaptchaSitekey)?,
        };

        tracing::debug!(
            login = %tokens.login_path,
            logout = %tokens.logout_path,
            url_done = %tokens.post_login_redirect,
            "Extracted login tokens"
        );

        Ok(tokens)
    }

    pub fn get(&self, field: TokenField) -> &str {
        match field {
            TokenField::Login => &self.login_path,
            TokenField::Logout => &self.logout_path,
            TokenField::UrlDone => &self.post_login_redirect,
            TokenField::RecaptchaSitekey => &self.anti_bot_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r#"
<html><head><script>
  var config = {
      'login': '/service/rest/v7/login',
      logout : '/service/rest/v7/logout',
      urlDone: '/service/secure/overview.jsp',
      recaptchaSitekey :'6LcAbCdEfG'
  };
</script></head><body></body></html>
"#;

    #[test]
    fn extracts_all_four_tokens() {
        let tokens = LoginTokens::extract(LOGIN_PAGE).unwrap();
        assert_eq!(tokens.login_path, "/service/rest/v7/login");
        assert_eq!(tokens.logout_path, "/service/rest/v7/logout");
        assert_eq!(tokens.post_login_redirect, "/service/secure/overview.jsp");
        assert_eq!(tokens.anti_bot_key, "6LcAbCdEfG");
    }

    #[test]
    fn each_missing_field_is_reported_by_name() {
        for field in TokenField::ALL {
            let value = LoginTokens::extract(LOGIN_PAGE).unwrap().get(field).to_string();
            let quoted = format!("'{value}'");
            let broken = LOGIN_PAGE.replace(&quoted, "null");

            assert_eq!(
                LoginTokens::extract(&broken),
                Err(ExtractionError::MissingToken(field)),
                "removing {field} should fail extraction"
            );
        }
    }

    #[test]
    fn empty_literal_counts_as_missing() {
        let page = LOGIN_PAGE.replace("'6LcAbCdEfG'", "''");
        assert_eq!(
            LoginTokens::extract(&page),
            Err(ExtractionError::MissingToken(TokenField::RecaptchaSitekey))
        );
    }

    #[test]
    fn login_key_must_be_quoted() {
        // A bare `login:` is some other script value, not the endpoint.
        let page = LOGIN_PAGE.replace("'login':", "login:");
        assert_eq!(
            LoginTokens::extract(&page),
            Err(ExtractionError::MissingToken(TokenField::Login))
        );
    }

    #[test]
    fn first_occurrence_wins() {
        let page = format!("{LOGIN_PAGE}<script>var x = {{ logout: '/other' }};</script>");
        let tokens = LoginTokens::extract(&page).unwrap();
        assert_eq!(tokens.logout_path, "/service/rest/v7/logout");
    }

    #[test]
    fn empty_body_reports_login_first() {
        assert_eq!(
            LoginTokens::extract(""),
            Err(ExtractionError::MissingToken(TokenField::Login))
        );
    }
}
