//! SMTP submission through a relay, using lettre.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailTransport, OutboundMessage, STATEMENT_CONTENT_TYPE};
use crate::credentials::SmtpCredentials;
use crate::error::{Error, Result};

/// Submission port used when the target does not name one.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Port on which the relay expects TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

static PDF: LazyLock<ContentType> = LazyLock::new(|| {
    ContentType::parse(STATEMENT_CONTENT_TYPE).expect("application/pdf is a valid content type")
});

/// A relay address, `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpTarget {
    pub host: String,
    pub port: u16,
}

impl SmtpTarget {
    /// Parse `host`, `host:port`, `[v6]` or `[v6]:port`.
    ///
    /// A missing port becomes [`DEFAULT_SMTP_PORT`]. Every other defect
    /// (empty host, stray colons, a port that is not a number) is an
    /// [`Error::AddressFormat`].
    pub fn parse(address: &str) -> Result<Self> {
        let malformed = |reason: &str| Error::AddressFormat {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = if let Some(rest) = address.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| malformed("missing ']' in address"))?;
            let port = match after {
                "" => None,
                _ => Some(
                    after
                        .strip_prefix(':')
                        .ok_or_else(|| malformed("unexpected text after ']'"))?,
                ),
            };
            (host, port)
        } else {
            match address.matches(':').count() {
                0 => (address, None),
                1 => {
                    let (host, port) = address.split_once(':').unwrap_or((address, ""));
                    (host, Some(port))
                }
                _ => return Err(malformed("too many colons in address")),
            }
        };

        if host.is_empty() {
            return Err(malformed("missing host"));
        }

        let port = match port {
            None => DEFAULT_SMTP_PORT,
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| malformed("invalid port"))?,
        };

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl FromStr for SmtpTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SmtpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address.parse().map_err(|source| Error::InvalidMailbox {
        address: address.to_string(),
        source,
    })
}

impl OutboundMessage {
    /// Render as a multipart/mixed message: the text body, then one PDF per statement.
    pub fn to_email(&self) -> Result<Message> {
        if self.to.is_empty() {
            return Err(Error::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(mailbox(&self.from)?)
            .subject(self.subject.as_str());
        for recipient in &self.to {
            builder = builder.to(mailbox(recipient)?);
        }

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));
        for document in &self.attachments {
            parts = parts.singlepart(
                Attachment::new(document.file_name.clone())
                    .body(document.content.clone(), PDF.clone()),
            );
        }

        Ok(builder.multipart(parts)?)
    }
}

/// Sends statement mail through one relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    target: SmtpTarget,
}

impl SmtpMailer {
    /// Configure a relay connection.
    ///
    /// Port 465 gets implicit TLS; any other port upgrades with STARTTLS when
    /// the relay offers it. AUTH is only attempted when credentials are given.
    /// Without a `timeout` lettre's own default applies.
    pub fn new(
        target: SmtpTarget,
        credentials: Option<&SmtpCredentials>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let tls_parameters = TlsParameters::new(target.host.clone())?;
        let tls = if target.port == IMPLICIT_TLS_PORT {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&target.host)
            .port(target.port)
            .tls(tls);
        if let Some(timeout) = timeout {
            builder = builder.timeout(Some(timeout));
        }
        if let Some(credentials) = credentials {
            builder = builder.credentials(credentials.to_lettre());
        }

        Ok(Self {
            transport: builder.build(),
            target,
        })
    }

    pub fn target(&self) -> &SmtpTarget {
        &self.target
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        let email = message.to_email()?;
        self.transport.send(email).await?;
        tracing::info!(relay = %self.target, "Message accepted by relay");
        Ok(())
    }
}
