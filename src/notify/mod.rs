//! Delivery of downloaded statements by email.

pub mod smtp;

use async_trait::async_trait;

pub use smtp::{SmtpMailer, SmtpTarget, DEFAULT_SMTP_PORT};

use crate::config::MailConfig;
use crate::error::Result;
use crate::portal::StatementDocument;

/// MIME type used for every statement attachment.
pub const STATEMENT_CONTENT_TYPE: &str = "application/pdf";

/// An email carrying statements as attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Attached in order; each is sent as [`STATEMENT_CONTENT_TYPE`].
    pub attachments: Vec<StatementDocument>,
}

/// Something that can put an [`OutboundMessage`] on the wire.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<()>;
}

/// Split a comma-separated recipient list, dropping blank entries.
pub fn parse_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds the statement mail and hands it to a transport.
pub struct Notifier {
    mail: MailConfig,
    recipients: Vec<String>,
    transport: Box<dyn MailTransport>,
}

impl Notifier {
    pub fn new(
        mail: MailConfig,
        recipients: Vec<String>,
        transport: Box<dyn MailTransport>,
    ) -> Self {
        Self {
            mail,
            recipients,
            transport,
        }
    }

    /// The message for `documents`, or `None` when there is nothing to send.
    pub fn compose(&self, documents: Vec<StatementDocument>) -> Option<OutboundMessage> {
        if documents.is_empty() {
            return None;
        }
        Some(OutboundMessage {
            from: self.mail.from.clone(),
            to: self.recipients.clone(),
            subject: self.mail.subject.clone(),
            body: self.mail.body.clone(),
            attachments: documents,
        })
    }

    /// Compose and send. Returns whether a message went out.
    pub async fn notify(&self, documents: Vec<StatementDocument>) -> Result<bool> {
        let Some(message) = self.compose(documents) else {
            tracing::info!("No statements to send");
            return Ok(false);
        };

        tracing::info!(
            recipients = message.to.len(),
            attachments = message.attachments.len(),
            "Sending statements"
        );
        self.transport.send(&message).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<OutboundMessage>>>,
    }

    #[async_trait]
    impl MailTransport for Recorder {
        async fn send(&self, message: &OutboundMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn doc(date: &str) -> StatementDocument {
        StatementDocument {
            file_name: format!("statement-{date}"),
            content: b"%PDF-1.4".to_vec(),
        }
    }

    #[test]
    fn recipients_are_split_and_trimmed() {
        assert_eq!(
            parse_recipients("a@example.com, b@example.com,,c@example.com "),
            vec!["a@example.com", "b@example.com", "c@example.com"]
        );
        assert!(parse_recipients(" , ").is_empty());
    }

    #[tokio::test]
    async fn nothing_is_sent_without_documents() {
        let recorder = Recorder::default();
        let notifier = Notifier::new(
            MailConfig::default(),
            vec!["a@example.com".into()],
            Box::new(recorder.clone()),
        );

        assert!(notifier.compose(Vec::new()).is_none());
        assert!(!notifier.notify(Vec::new()).await.unwrap());
        assert!(recorder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_message_with_attachments_in_order() {
        let recorder = Recorder::default();
        let notifier = Notifier::new(
            MailConfig::default(),
            parse_recipients("a@example.com,b@example.com"),
            Box::new(recorder.clone()),
        );

        assert!(notifier
            .notify(vec![doc("20230201"), doc("20230101")])
            .await
            .unwrap());

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let message = &sent[0];
        assert_eq!(message.from, "Qander Automailer <nobody@polyware.nl>");
        assert_eq!(message.to, ["a@example.com", "b@example.com"]);
        assert_eq!(message.subject, "Uw rekeningoverzicht van Qander");
        let names: Vec<&str> = message
            .attachments
            .iter()
            .map(|a| a.file_name.as_str())
            .collect();
        assert_eq!(names, ["statement-20230201", "statement-20230101"]);
    }
}
