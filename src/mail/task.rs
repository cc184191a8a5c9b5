use crate::config::MailSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbound email task payload.
///
/// Serialized as field-named JSON so the consumer shares only this contract
/// with the producer, not a compiled schema. `queued_at` records the enqueue
/// instant in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTask {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub from: String,
    pub from_name: String,
    pub queued_at: DateTime<Utc>,
}

impl EmailTask {
    /// Build a task for the configured from-address, stamped with the
    /// current time.
    pub fn compose(
        settings: &MailSettings,
        to: &[String],
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Self {
        Self {
            to: to.to_vec(),
            subject: subject.to_string(),
            body: body.to_string(),
            is_html,
            from: settings.from_email.clone(),
            from_name: settings.from_name.clone(),
            queued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MailSettings {
        MailSettings {
            from_email: "noreply@example.com".to_string(),
            from_name: "Example".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_compose_uses_configured_sender() {
        let task = EmailTask::compose(
            &settings(),
            &["a@x.com".to_string()],
            "hi",
            "there",
            false,
        );

        assert_eq!(task.to, vec!["a@x.com"]);
        assert_eq!(task.from, "noreply@example.com");
        assert_eq!(task.from_name, "Example");
        assert!(!task.is_html);
    }

    #[test]
    fn test_json_round_trip() {
        // Round-trip law: what the producer serializes, the handler
        // deserializes to an equal value
        let task = EmailTask::compose(
            &settings(),
            &["a@x.com".to_string(), "b@x.com".to_string()],
            "subject",
            "<p>body</p>",
            true,
        );

        let bytes = serde_json::to_vec(&task).unwrap();
        let decoded: EmailTask = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, task);
    }

    #[test]
    fn test_payload_is_field_named() {
        let task = EmailTask::compose(&settings(), &["a@x.com".to_string()], "hi", "there", false);
        let value: serde_json::Value = serde_json::to_value(&task).unwrap();

        assert!(value.get("to").is_some());
        assert!(value.get("subject").is_some());
        assert!(value.get("queued_at").is_some());
    }
}
