//! Outgoing mail messages.

use lettre::message::{header::ContentType, Mailbox};
use lettre::Message;

use crate::error::ModuleError;

/// A plain-text mail message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailMessage {
    /// Sender address. `None` uses the module's configured sender.
    pub sender: Option<String>,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            recipients: vec![recipient.into()],
            ..Self::default()
        }
    }

    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.recipients.push(recipient.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// A message without recipients carries nothing to send.
    pub fn is_empty(&self) -> bool {
        self.recipients.iter().all(|r| r.trim().is_empty())
    }

    /// Build the wire message. Bad addresses are invalid arguments.
    pub fn to_lettre(&self, default_sender: &str) -> Result<Message, ModuleError> {
        let sender = self.sender.as_deref().unwrap_or(default_sender);
        let mut builder = Message::builder()
            .from(parse_mailbox(sender)?)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN);

        for recipient in self.recipients.iter().filter(|r| !r.trim().is_empty()) {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        builder
            .body(self.body.clone())
            .map_err(|e| ModuleError::InvalidArgument(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ModuleError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| ModuleError::InvalidArgument(format!("{address}: {e}")))
}
