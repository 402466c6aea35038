//! Error taxonomy for a statement run.
//!
//! Every variant here is fatal. Per-statement problems (an unparseable date,
//! a statement older than the cutoff) are not errors; they surface as
//! [`StatementOutcome`](crate::pipeline::StatementOutcome) values instead.

use std::fmt;

use thiserror::Error;

use crate::portal::TokenField;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The step of a run that issued a request or produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoginPage,
    Login,
    Statements,
    Download,
    Notify,
    Logout,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::LoginPage => "login page",
            Phase::Login => "login",
            Phase::Statements => "statements page",
            Phase::Download => "statement download",
            Phase::Notify => "notify",
            Phase::Logout => "logout",
        };
        f.write_str(name)
    }
}

/// A required value was absent from markup served by the portal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("login page has no `{0}` value; the portal markup changed")]
    MissingToken(TokenField),

    #[error("statements page lists no downloadable statements")]
    NoStatements,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("{phase} request to {url} failed: {source}")]
    Transport {
        phase: Phase,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid portal URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("malformed SMTP address `{address}`: {reason}")]
    AddressFormat { address: String, reason: String },

    #[error("invalid mailbox `{address}`: {source}")]
    InvalidMailbox {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("no mail recipients configured")]
    NoRecipients,

    #[error("failed to compose message: {0}")]
    Compose(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Delivery(#[from] lettre::transport::smtp::Error),
}

impl Error {
    /// The missing-token field, when this is a login page extraction failure.
    pub fn missing_token(&self) -> Option<TokenField> {
        match self {
            Error::Extraction(ExtractionError::MissingToken(field)) => Some(*field),
            _ => None,
        }
    }

    pub fn is_extraction(&self) -> bool {
        matches!(self, Error::Extraction(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}
