//! Cookie-carrying HTTP session bound to the portal origin.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use url::Url;

use super::cookies::SiteCookieStore;
use crate::config::PortalConfig;
use crate::error::{Error, Phase, Result};

/// One browsing session against the portal.
///
/// All requests share a single cookie store, so cookies set while loading the
/// login page and while logging in are sent with every later request. Nothing
/// else touches the store.
pub struct PortalSession {
    client: Client,
    base_url: Url,
    cookies: Arc<SiteCookieStore>,
}

impl PortalSession {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|source| Error::InvalidUrl {
            url: config.base_url.clone(),
            source,
        })?;

        let cookies = Arc::new(SiteCookieStore::new());
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .cookie_provider(Arc::clone(&cookies));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::Client)?;

        Ok(Self {
            client,
            base_url,
            cookies,
        })
    }

    /// Shorthand for a session against `base_url` with default settings.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(&PortalConfig {
            base_url: base_url.into(),
            ..PortalConfig::default()
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a site-relative path (or an absolute URL) against the origin.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|source| Error::InvalidUrl {
            url: path.to_string(),
            source,
        })
    }

    /// The `Cookie` header the session would send to `path`, if any.
    pub fn cookie_header(&self, path: &str) -> Option<String> {
        use reqwest::cookie::CookieStore;

        let url = self.url(path).ok()?;
        self.cookies
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    pub async fn get_text(&self, phase: Phase, path: &str) -> Result<String> {
        let url = self.url(path)?;
        let response = self.send(phase, &url, self.client.get(url.clone())).await?;
        response
            .text()
            .await
            .map_err(|source| transport(phase, &url, source))
    }

    pub async fn get_bytes(&self, phase: Phase, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path)?;
        let response = self.send(phase, &url, self.client.get(url.clone())).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| transport(phase, &url, source))?;
        Ok(bytes.to_vec())
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        phase: Phase,
        path: &str,
        body: &T,
    ) -> Result<String> {
        let url = self.url(path)?;
        let request = self.client.post(url.clone()).json(body);
        let response = self.send(phase, &url, request).await?;
        response
            .text()
            .await
            .map_err(|source| transport(phase, &url, source))
    }

    /// POST without a body, still announced as JSON like the portal's own script does.
    pub async fn post_empty(&self, phase: Phase, path: &str) -> Result<String> {
        let url = self.url(path)?;
        let request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json");
        let response = self.send(phase, &url, request).await?;
        response
            .text()
            .await
            .map_err(|source| transport(phase, &url, source))
    }

    async fn send(&self, phase: Phase, url: &Url, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| transport(phase, url, source))?;

        tracing::debug!(%phase, %url, status = %response.status(), "Portal response");

        response
            .error_for_status()
            .map_err(|source| transport(phase, url, source))
    }
}

fn transport(phase: Phase, url: &Url, source: reqwest::Error) -> Error {
    Error::Transport {
        phase,
        url: url.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_paths_against_origin() {
        let session = PortalSession::with_base_url("https://www.qander.nl").unwrap();
        assert_eq!(
            session.url("/service/login.jsp").unwrap().as_str(),
            "https://www.qander.nl/service/login.jsp"
        );
        assert_eq!(
            session.url("https://static.qander.nl/x").unwrap().as_str(),
            "https://static.qander.nl/x"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = PortalSession::with_base_url("not a url").err().unwrap();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn new_session_has_no_cookies() {
        let session = PortalSession::with_base_url("https://www.qander.nl").unwrap();
        assert_eq!(session.cookie_header("/service/login.jsp"), None);
    }
}
