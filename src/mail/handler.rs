use super::smtp::EmailSender;
use super::task::EmailTask;
use crate::broker::{Producer, PublishError};
use crate::config::MailSettings;
use crate::handlers::{HandlerError, HandlerFactory, TaskHandler};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Producer side: hands outbound email to the mail queue.
///
/// Called by request handlers; returns as soon as the broker accepts the
/// publish. The caller only ever sees success or an immediate broker error,
/// never the eventual SMTP outcome.
pub struct Mailer {
    producer: Producer,
    settings: MailSettings,
}

impl Mailer {
    pub fn new(producer: Producer, settings: MailSettings) -> Self {
        Self { producer, settings }
    }

    pub async fn queue_email(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Result<(), PublishError> {
        let task = EmailTask::compose(&self.settings, to, subject, body, is_html);
        self.producer
            .enqueue(&self.settings.queue_name, &task)
            .await?;

        info!(
            recipients = ?task.to,
            subject = %task.subject,
            queue = %self.settings.queue_name,
            "Email queued"
        );
        Ok(())
    }

    /// Single-recipient convenience wrapper
    pub async fn queue_email_to(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Result<(), PublishError> {
        self.queue_email(&[to.to_string()], subject, body, is_html)
            .await
    }
}

/// Consumer side: processes one mail-queue delivery.
pub struct MailHandler {
    sender: Arc<dyn EmailSender>,
}

impl MailHandler {
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl TaskHandler for MailHandler {
    async fn process(&self, body: &[u8]) -> Result<(), HandlerError> {
        let task: EmailTask = serde_json::from_slice(body)
            .map_err(|err| HandlerError::MalformedTask(err.to_string()))?;

        self.sender
            .send(&task)
            .await
            .map_err(|err| HandlerError::Execution(err.to_string()))?;

        info!(recipients = ?task.to, subject = %task.subject, "Email sent");
        Ok(())
    }
}

/// Registers the mail handler under the configured queue name and builds a
/// fresh [`MailHandler`] per delivery.
pub struct MailHandlerFactory {
    queue_name: String,
    sender: Arc<dyn EmailSender>,
}

impl MailHandlerFactory {
    pub fn new(settings: &MailSettings, sender: Arc<dyn EmailSender>) -> Self {
        Self {
            queue_name: settings.queue_name.clone(),
            sender,
        }
    }
}

impl HandlerFactory for MailHandlerFactory {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    fn create(&self) -> Box<dyn TaskHandler> {
        Box::new(MailHandler::new(self.sender.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MockEmailSender;

    fn sample_task() -> EmailTask {
        let settings = MailSettings {
            from_email: "noreply@example.com".to_string(),
            ..Default::default()
        };
        EmailTask::compose(&settings, &["a@x.com".to_string()], "hi", "there", false)
    }

    #[tokio::test]
    async fn test_process_sends_decoded_task() {
        let sender = Arc::new(MockEmailSender::new());
        let handler = MailHandler::new(sender.clone());

        let task = sample_task();
        let body = serde_json::to_vec(&task).unwrap();

        handler.process(&body).await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], task);
    }

    #[tokio::test]
    async fn test_process_rejects_malformed_payload() {
        let handler = MailHandler::new(Arc::new(MockEmailSender::new()));

        let result = handler.process(b"not json").await;
        assert!(matches!(result, Err(HandlerError::MalformedTask(_))));
    }

    #[tokio::test]
    async fn test_process_propagates_transport_failure() {
        let sender = Arc::new(MockEmailSender::new());
        sender.fail_with("connection refused");
        let handler = MailHandler::new(sender.clone());

        let body = serde_json::to_vec(&sample_task()).unwrap();
        let result = handler.process(&body).await;

        assert!(matches!(result, Err(HandlerError::Execution(_))));
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_factory_builds_fresh_handlers() {
        let settings = MailSettings {
            queue_name: "taskbox.mail".to_string(),
            from_email: "noreply@example.com".to_string(),
            ..Default::default()
        };
        let factory = MailHandlerFactory::new(&settings, Arc::new(MockEmailSender::new()));

        assert_eq!(factory.queue_name(), "taskbox.mail");

        // Two instances must process independently
        let first = factory.create();
        let second = factory.create();
        let body = serde_json::to_vec(&sample_task()).unwrap();
        first.process(&body).await.unwrap();
        second.process(&body).await.unwrap();
    }
}
