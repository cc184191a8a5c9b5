use super::connection::{BrokerConnection, BrokerError};
use chrono::Utc;
use lapin::BasicProperties;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Persistent delivery mode (survives broker restart for durable queues)
const DELIVERY_MODE_PERSISTENT: u8 = 2;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Connection error: {0}")]
    Connection(#[from] BrokerError),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Publish failed: {0}")]
    Publish(#[from] lapin::Error),
}

/// Publishes tasks to named durable queues.
///
/// Enqueueing is fire-and-forget with respect to consumption: the call
/// returns once the broker has accepted the publish, never waiting for a
/// consumer. Each publish uses its own short-lived channel, so concurrent
/// callers never share channel state.
#[derive(Clone)]
pub struct Producer {
    broker: Arc<BrokerConnection>,
}

impl Producer {
    pub fn new(broker: Arc<BrokerConnection>) -> Self {
        Self { broker }
    }

    /// Serialize `task` as JSON and publish it to `queue_name`.
    ///
    /// The queue is declared durable / non-exclusive / non-auto-delete first
    /// (idempotent if it already exists with matching properties). Messages
    /// are marked persistent and published on the default exchange with the
    /// queue name as routing key; the enqueue instant rides in the AMQP
    /// `timestamp` property.
    pub async fn enqueue<T: Serialize>(
        &self,
        queue_name: &str,
        task: &T,
    ) -> Result<(), PublishError> {
        let channel = self.broker.create_channel().await?;

        channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let body = serde_json::to_vec(task)?;
        let properties = BasicProperties::default()
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT)
            .with_content_type("application/json".into())
            .with_timestamp(Utc::now().timestamp().max(0) as u64);

        channel
            .basic_publish(
                "",
                queue_name,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await?
            .await?;

        debug!(queue = queue_name, size = body.len(), "Task published");

        if let Err(error) = channel.close(200, "publish done").await {
            debug!(error = %error, "Publish channel close failed");
        }

        Ok(())
    }
}
