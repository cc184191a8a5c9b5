use lapin::BasicProperties;
use lapin::types::{AMQPValue, FieldTable};

/// Header carrying the number of failed attempts a message has accumulated
pub const ATTEMPTS_HEADER: &str = "x-attempts";

/// Header carrying the last handler error, set when a message is retried or
/// dead-lettered
pub const LAST_ERROR_HEADER: &str = "x-last-error";

/// Dead-letter queue name for a work queue
pub fn dead_letter_queue(queue_name: &str) -> String {
    format!("{queue_name}.dlq")
}

/// What to do with a delivery whose handler failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Republish to the same queue with the attempt counter incremented,
    /// then ack the original
    Retry { next_attempt: u32 },
    /// Publish to the dead-letter queue, then ack the original
    DeadLetter,
    /// Nack with requeue; the broker redelivers the message unchanged
    Requeue,
}

/// Decide the failure action for a delivery.
///
/// `attempts` is the count of failures already recorded on the message
/// (absent header = 0, i.e. this was the first processing attempt).
/// `max_attempts = 0` disables the cap entirely: every failure requeues.
pub fn decide(attempts: u32, max_attempts: u32) -> FailureAction {
    if max_attempts == 0 {
        FailureAction::Requeue
    } else if attempts + 1 < max_attempts {
        FailureAction::Retry {
            next_attempt: attempts + 1,
        }
    } else {
        FailureAction::DeadLetter
    }
}

/// Read the attempt counter from message properties
pub fn attempts_from(properties: &BasicProperties) -> u32 {
    properties
        .headers()
        .as_ref()
        .and_then(|headers| {
            headers
                .inner()
                .iter()
                .find_map(|(key, value)| (key.as_str() == ATTEMPTS_HEADER).then_some(value))
        })
        .and_then(|value| match value {
            AMQPValue::LongLongInt(n) => u32::try_from(*n).ok(),
            AMQPValue::LongInt(n) => u32::try_from(*n).ok(),
            AMQPValue::LongUInt(n) => Some(*n),
            _ => None,
        })
        .unwrap_or(0)
}

/// Properties for a retried or dead-lettered copy of a delivery: the original
/// properties with the attempt counter and last error stamped into headers.
pub fn stamped_properties(
    original: &BasicProperties,
    attempts: u32,
    last_error: &str,
) -> BasicProperties {
    let mut headers = original
        .headers()
        .as_ref()
        .map(FieldTable::clone)
        .unwrap_or_default();
    headers.insert(
        ATTEMPTS_HEADER.into(),
        AMQPValue::LongLongInt(i64::from(attempts)),
    );
    headers.insert(
        LAST_ERROR_HEADER.into(),
        AMQPValue::LongString(last_error.into()),
    );
    original.clone().with_headers(headers)
}
