//! Secrets needed for one run: the portal login and the optional SMTP login.
//!
//! Values are held in [`SecretString`] so they stay out of `Debug` output and
//! logs. They are only exposed at the point of use (the login payload and
//! the SMTP AUTH exchange).

use secrecy::{ExposeSecret, SecretString};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Portal login for the single account processed per run.
#[derive(Debug)]
pub struct Credentials {
    identifier: String,
    secret: SecretString,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The JSON body the portal's login endpoint expects.
    pub fn login_payload(&self) -> LoginPayload<'_> {
        LoginPayload { credentials: self }
    }
}

/// Serializes as `{"emailAddress": .., "password": .., "reCaptchaResponse": null}`.
pub struct LoginPayload<'a> {
    credentials: &'a Credentials,
}

impl Serialize for LoginPayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LoginPayload", 3)?;
        state.serialize_field("emailAddress", &self.credentials.identifier)?;
        state.serialize_field("password", self.credentials.secret.expose_secret())?;
        state.serialize_field("reCaptchaResponse", &Option::<String>::None)?;
        state.end()
    }
}

/// SMTP AUTH login. Only used when both halves are configured.
#[derive(Debug)]
pub struct SmtpCredentials {
    username: String,
    password: SecretString,
}

impl SmtpCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Builds credentials from optional CLI/env values.
    ///
    /// Returns `None` unless both the username and password are non-empty,
    /// which means the relay is used without AUTH.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some(Self::new(user, pass))
            }
            _ => None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn to_lettre(&self) -> lettre::transport::smtp::authentication::Credentials {
        lettre::transport::smtp::authentication::Credentials::new(
            self.username.clone(),
            self.password.expose_secret().to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_payload_has_portal_field_names() {
        let creds = Credentials::new("user@example.com", "hunter2");
        let json = serde_json::to_value(creds.login_payload()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "emailAddress": "user@example.com",
                "password": "hunter2",
                "reCaptchaResponse": null,
            })
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::new("user@example.com", "hunter2");
        let smtp = SmtpCredentials::new("mailer", "s3cret");
        assert!(!format!("{creds:?}").contains("hunter2"));
        assert!(!format!("{smtp:?}").contains("s3cret"));
    }

    #[test]
    fn smtp_credentials_need_both_parts() {
        assert!(SmtpCredentials::from_parts(None, None).is_none());
        assert!(SmtpCredentials::from_parts(Some("u".into()), None).is_none());
        assert!(SmtpCredentials::from_parts(Some(String::new()), Some("p".into())).is_none());
        let creds = SmtpCredentials::from_parts(Some("u".into()), Some("p".into())).unwrap();
        assert_eq!(creds.username(), "u");
    }
}
