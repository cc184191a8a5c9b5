use super::task::EmailTask;
use crate::config::MailSettings;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp transport failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("email has no recipients")]
    NoRecipients,

    /// Transport-agnostic failure, for sender implementations not backed by
    /// lettre (e.g. test doubles)
    #[error("email send failed: {0}")]
    Failed(String),
}

/// Outbound email collaborator.
///
/// The mail handler talks to this seam instead of an SMTP client directly so
/// tests can substitute a recording mock.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &EmailTask) -> Result<(), MailError>;
}

/// SMTP-backed sender
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSender {
    pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
        let mut builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_host)
        };

        builder = builder.port(settings.smtp_port);

        if let (Some(username), Some(password)) =
            (&settings.smtp_username, &settings.smtp_password)
        {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, email: &EmailTask) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let from_address: Address = email.from.parse()?;
        let mut builder = Message::builder()
            .from(Mailbox::new(Some(email.from_name.clone()), from_address))
            .subject(email.subject.clone());

        for recipient in &email.to {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }

        let content_type = if email.is_html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };
        let message = builder.header(content_type).body(email.body.clone())?;

        self.transport.send(message).await?;
        debug!(recipients = ?email.to, "SMTP send completed");
        Ok(())
    }
}

/// Recording sender for tests
#[derive(Default)]
pub struct MockEmailSender {
    sent: std::sync::Mutex<Vec<EmailTask>>,
    fail_with: std::sync::Mutex<Option<String>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail with the given transport message
    pub fn fail_with(&self, message: &str) {
        if let Ok(mut guard) = self.fail_with.lock() {
            *guard = Some(message.to_string());
        }
    }

    pub fn sent(&self) -> Vec<EmailTask> {
        self.sent.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailSender for MockEmailSender {
    async fn send(&self, email: &EmailTask) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        let failure = self
            .fail_with
            .lock()
            .ok()
            .and_then(|guard| guard.clone());
        if let Some(message) = failure {
            return Err(MailError::Failed(message));
        }
        if let Ok(mut guard) = self.sent.lock() {
            guard.push(email.clone());
        }
        Ok(())
    }
}
