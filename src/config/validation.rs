use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Mail queue name must not be empty")]
    EmptyQueueName,

    #[error("Queue name '{0}' contains whitespace")]
    QueueNameWhitespace(String),

    #[error("Worker prefetch must be at least 1")]
    ZeroPrefetch,

    #[error("Broker reconnect delay must be positive")]
    ZeroReconnectDelay,

    #[error("Mail from_email must be set when a mail queue is configured")]
    MissingFromEmail,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_queues(config)?;
    validate_worker(config)?;
    validate_broker(config)?;
    validate_mail(config)?;
    Ok(())
}

fn validate_queues(config: &Config) -> Result<(), ValidationError> {
    let name = &config.mail.queue_name;
    if name.is_empty() {
        return Err(ValidationError::EmptyQueueName);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ValidationError::QueueNameWhitespace(name.clone()));
    }
    Ok(())
}

fn validate_worker(config: &Config) -> Result<(), ValidationError> {
    if config.worker.prefetch == 0 {
        return Err(ValidationError::ZeroPrefetch);
    }
    Ok(())
}

fn validate_broker(config: &Config) -> Result<(), ValidationError> {
    if config.broker.reconnect_delay_secs == 0 {
        return Err(ValidationError::ZeroReconnectDelay);
    }
    Ok(())
}

fn validate_mail(config: &Config) -> Result<(), ValidationError> {
    if config.mail.from_email.is_empty() {
        return Err(ValidationError::MissingFromEmail);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::Config;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.mail.from_email = "noreply@example.com".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_queue_name_rejected() {
        let mut config = valid_config();
        config.mail.queue_name = String::new();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::EmptyQueueName)
        ));
    }

    #[test]
    fn test_queue_name_with_spaces_rejected() {
        let mut config = valid_config();
        config.mail.queue_name = "mail queue".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::QueueNameWhitespace(_))
        ));
    }

    #[test]
    fn test_zero_prefetch_rejected() {
        let mut config = valid_config();
        config.worker.prefetch = 0;
        assert!(matches!(validate(&config), Err(ValidationError::ZeroPrefetch)));
    }

    #[test]
    fn test_missing_from_email_rejected() {
        let mut config = valid_config();
        config.mail.from_email = String::new();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingFromEmail)
        ));
    }
}
