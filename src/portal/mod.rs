//! Client for the statement portal's web interface.
//!
//! The portal has no API. A run goes through its HTML pages the way a browser
//! would, in two states:
//!
//! - [`Portal`]: a fresh session. It loads the login page to learn the
//!   current endpoint paths, then posts the credentials.
//! - [`AuthenticatedPortal`]: the session after a successful login. It lists
//!   and downloads statements and ends with [`AuthenticatedPortal::logout`],
//!   which consumes it.

mod cookies;
pub mod filter;
mod session;
pub mod statements;
pub mod tokens;

pub use cookies::SiteCookieStore;
pub use filter::{AgePolicy, Selection};
pub use session::PortalSession;
pub use statements::{parse_statement_refs, StatementDocument, StatementRef};
pub use tokens::{LoginTokens, TokenField};

use tracing::info;

use crate::credentials::Credentials;
use crate::error::{Phase, Result};

pub const LOGIN_PAGE_PATH: &str = "/service/login.jsp";
pub const STATEMENTS_PAGE_PATH: &str = "/service/secure/statements.jsp";

/// An unauthenticated portal session.
pub struct Portal {
    session: PortalSession,
}

impl Portal {
    pub fn new(session: PortalSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &PortalSession {
        &self.session
    }

    /// Load the login page and read the endpoint tokens from it.
    ///
    /// Cookies handed out with the page stay in the session for the login post.
    pub async fn fetch_login_tokens(&self) -> Result<LoginTokens> {
        let body = self
            .session
            .get_text(Phase::LoginPage, LOGIN_PAGE_PATH)
            .await?;
        Ok(LoginTokens::extract(&body)?)
    }

    /// Post the credentials to the login endpoint named in `tokens`.
    ///
    /// Any non-success HTTP status fails the login; the session is consumed
    /// either way.
    pub async fn login(
        self,
        credentials: &Credentials,
        tokens: LoginTokens,
    ) -> Result<AuthenticatedPortal> {
        info!(user = credentials.identifier(), "Logging in");
        self.session
            .post_json(Phase::Login, &tokens.login_path, &credentials.login_payload())
            .await?;

        Ok(AuthenticatedPortal {
            session: self.session,
            tokens,
        })
    }
}

/// A logged-in portal session.
pub struct AuthenticatedPortal {
    session: PortalSession,
    tokens: LoginTokens,
}

impl AuthenticatedPortal {
    pub fn session(&self) -> &PortalSession {
        &self.session
    }

    pub fn tokens(&self) -> &LoginTokens {
        &self.tokens
    }

    /// Fetch the statements page and list its download links in page order.
    pub async fn list_statements(&self) -> Result<Vec<StatementRef>> {
        let body = self
            .session
            .get_text(Phase::Statements, STATEMENTS_PAGE_PATH)
            .await?;
        let refs = parse_statement_refs(&body)?;
        info!(count = refs.len(), "Found statements");
        Ok(refs)
    }

    /// Download the PDF behind one statement link.
    pub async fn download(&self, statement: &StatementRef) -> Result<StatementDocument> {
        let content = self
            .session
            .get_bytes(Phase::Download, &statement.download_path)
            .await?;
        info!(
            date = %statement.date_token,
            bytes = content.len(),
            "Downloaded statement"
        );
        Ok(StatementDocument {
            file_name: statement.file_name(),
            content,
        })
    }

    /// End the portal session. Consumes the session, so it runs at most once.
    pub async fn logout(self) -> Result<()> {
        self.session
            .post_empty(Phase::Logout, &self.tokens.logout_path)
            .await?;
        info!("Logged out");
        Ok(())
    }
}
