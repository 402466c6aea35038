//! Cookie storage for the portal session.
//!
//! Wraps reqwest's [`Jar`] and refuses cookies scoped to a public suffix
//! (for example `Domain=.nl`), so the session cannot plant cookies that would
//! be sent to unrelated sites.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use url::Url;

#[derive(Debug, Default)]
pub struct SiteCookieStore {
    jar: Jar,
}

impl SiteCookieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for SiteCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let host = url.host_str().unwrap_or_default();
        let mut accepted = cookie_headers.filter(|header| {
            let Some(domain) = header.to_str().ok().and_then(cookie_domain) else {
                return true;
            };
            if is_foreign_public_suffix(&domain, host) {
                tracing::warn!(%domain, %host, "Rejecting cookie scoped to a public suffix");
                return false;
            }
            true
        });
        self.jar.set_cookies(&mut accepted, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

/// The `Domain` attribute of a `Set-Cookie` header, lowercased and without a leading dot.
fn cookie_domain(set_cookie: &str) -> Option<String> {
    set_cookie.split(';').skip(1).find_map(|attr| {
        let (name, value) = attr.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("domain") {
            return None;
        }
        let domain = value.trim().trim_start_matches('.').to_ascii_lowercase();
        (!domain.is_empty()).then_some(domain)
    })
}

/// True when `domain` is itself a public suffix and is not the host that set it.
///
/// A public suffix equal to the request host is allowed and behaves like a
/// host-only cookie.
fn is_foreign_public_suffix(domain: &str, host: &str) -> bool {
    if domain.eq_ignore_ascii_case(host) {
        return false;
    }
    psl::suffix_str(domain) == Some(domain)
}
