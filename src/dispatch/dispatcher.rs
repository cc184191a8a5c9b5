use crate::broker::{BrokerConnection, BrokerError};
use crate::config::WorkerSettings;
use crate::handlers::HandlerRegistry;
use futures::{FutureExt, StreamExt};
use lapin::Channel;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::retry::{self, FailureAction};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Connection error: {0}")]
    Connection(#[from] BrokerError),

    #[error("Channel operation failed: {0}")]
    Channel(#[from] lapin::Error),
}

/// How a consumer loop iteration ended
enum LoopExit {
    Shutdown,
    StreamEnded,
}

/// Runs one consumption loop per registered handler.
///
/// Each loop owns a dedicated channel, declares its durable queue, applies
/// the prefetch limit, and consumes with manual acknowledgment. A torn-down
/// channel is detected and the loop re-establishes itself after the
/// configured reconnect delay; it never exits silently. Loops are independent:
/// a queue whose declaration keeps failing retries alone without affecting
/// the others.
pub struct Dispatcher {
    broker: Arc<BrokerConnection>,
    registry: Arc<HandlerRegistry>,
    settings: WorkerSettings,
    reconnect_delay: Duration,
    shutdown: broadcast::Sender<()>,
}

impl Dispatcher {
    pub fn new(
        broker: Arc<BrokerConnection>,
        registry: Arc<HandlerRegistry>,
        settings: WorkerSettings,
        reconnect_delay: Duration,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            broker,
            registry,
            settings,
            reconnect_delay,
            shutdown,
        }
    }

    /// Spawn one supervised consumer loop per registered queue.
    ///
    /// Returns the join handles; await them after [`Dispatcher::shutdown`] to
    /// drain the loops deterministically.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.registry
            .queue_names()
            .map(|queue_name| {
                let worker = ConsumerLoop {
                    broker: self.broker.clone(),
                    registry: self.registry.clone(),
                    queue_name: queue_name.to_string(),
                    settings: self.settings.clone(),
                    reconnect_delay: self.reconnect_delay,
                };
                let shutdown = self.shutdown.subscribe();
                tokio::spawn(worker.run(shutdown))
            })
            .collect()
    }

    /// Signal every consumer loop to stop accepting deliveries and release
    /// its channel. In-flight unacknowledged messages are left for the broker
    /// to redeliver after the consumer disconnects.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

struct ConsumerLoop {
    broker: Arc<BrokerConnection>,
    registry: Arc<HandlerRegistry>,
    queue_name: String,
    settings: WorkerSettings,
    reconnect_delay: Duration,
}

impl ConsumerLoop {
    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            match self.consume(&mut shutdown).await {
                Ok(LoopExit::Shutdown) => {
                    info!(queue = %self.queue_name, "Consumer stopped");
                    return;
                }
                Ok(LoopExit::StreamEnded) => {
                    warn!(queue = %self.queue_name, "Consumer stream ended, re-establishing");
                }
                Err(err) => {
                    warn!(
                        queue = %self.queue_name,
                        error = %err,
                        "Consumer loop failed, re-establishing"
                    );
                }
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!(queue = %self.queue_name, "Consumer stopped");
                    return;
                }
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn consume(
        &self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<LoopExit, DispatchError> {
        let channel = self.broker.create_channel().await?;

        channel
            .queue_declare(
                &self.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .basic_qos(self.settings.prefetch, BasicQosOptions::default())
            .await?;

        let mut consumer = channel
            .basic_consume(
                &self.queue_name,
                &format!("taskbox-{}", self.queue_name),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(
            queue = %self.queue_name,
            prefetch = self.settings.prefetch,
            "Started consuming"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    close_channel(&channel, &self.queue_name).await;
                    return Ok(LoopExit::Shutdown);
                }
                delivery = consumer.next() => match delivery {
                    Some(Ok(delivery)) => {
                        // Shutdown mid-processing drops the in-flight future;
                        // the unacked delivery goes back to the broker when
                        // the channel closes
                        tokio::select! {
                            _ = shutdown.recv() => {
                                close_channel(&channel, &self.queue_name).await;
                                return Ok(LoopExit::Shutdown);
                            }
                            _ = self.handle_delivery(&channel, delivery) => {}
                        }
                    }
                    Some(Err(err)) => return Err(DispatchError::Channel(err)),
                    None => return Ok(LoopExit::StreamEnded),
                }
            }
        }
    }

    async fn handle_delivery(&self, channel: &Channel, delivery: Delivery) {
        // Fresh handler instance per message
        let handler = match self.registry.resolve(&self.queue_name) {
            Ok(handler) => handler,
            Err(err) => {
                // Unreachable in practice: the loop only consumes registered queues
                error!(queue = %self.queue_name, error = %err, "Handler resolution failed");
                nack_requeue(&delivery, &self.queue_name).await;
                return;
            }
        };

        // A panicking handler must not take the consumer loop down with it;
        // the delivery follows the normal failure path instead
        let outcome = std::panic::AssertUnwindSafe(handler.process(&delivery.data))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                if let Err(error) = delivery.ack(BasicAckOptions::default()).await {
                    warn!(queue = %self.queue_name, error = %error, "Ack failed");
                } else {
                    debug!(
                        queue = %self.queue_name,
                        redelivered = delivery.redelivered,
                        "Message processed"
                    );
                }
            }
            Ok(Err(err)) => {
                warn!(queue = %self.queue_name, error = %err, "Handler failed");
                self.apply_failure_policy(channel, delivery, &err.to_string())
                    .await;
            }
            Err(_) => {
                error!(queue = %self.queue_name, "Handler panicked");
                self.apply_failure_policy(channel, delivery, "handler panicked")
                    .await;
            }
        }
    }

    async fn apply_failure_policy(&self, channel: &Channel, delivery: Delivery, reason: &str) {
        let attempts = retry::attempts_from(&delivery.properties);

        match retry::decide(attempts, self.settings.max_attempts) {
            FailureAction::Requeue => nack_requeue(&delivery, &self.queue_name).await,
            FailureAction::Retry { next_attempt } => {
                let properties =
                    retry::stamped_properties(&delivery.properties, next_attempt, reason);
                let republish = channel
                    .basic_publish(
                        "",
                        &self.queue_name,
                        BasicPublishOptions::default(),
                        &delivery.data,
                        properties,
                    )
                    .await;

                match flatten_confirm(republish).await {
                    Ok(()) => {
                        warn!(
                            queue = %self.queue_name,
                            attempt = next_attempt,
                            max_attempts = self.settings.max_attempts,
                            "Message requeued for retry"
                        );
                        ack_or_warn(&delivery, &self.queue_name).await;
                    }
                    Err(error) => {
                        warn!(
                            queue = %self.queue_name,
                            error = %error,
                            "Retry republish failed, requeueing original"
                        );
                        nack_requeue(&delivery, &self.queue_name).await;
                    }
                }
            }
            FailureAction::DeadLetter => {
                let dlq = retry::dead_letter_queue(&self.queue_name);
                match self
                    .publish_dead_letter(channel, &dlq, &delivery, attempts, reason)
                    .await
                {
                    Ok(()) => {
                        error!(
                            queue = %self.queue_name,
                            dlq = %dlq,
                            attempts = attempts + 1,
                            "Message dead-lettered"
                        );
                        ack_or_warn(&delivery, &self.queue_name).await;
                    }
                    Err(error) => {
                        warn!(
                            queue = %self.queue_name,
                            dlq = %dlq,
                            error = %error,
                            "Dead-letter publish failed, requeueing original"
                        );
                        nack_requeue(&delivery, &self.queue_name).await;
                    }
                }
            }
        }
    }

    async fn publish_dead_letter(
        &self,
        channel: &Channel,
        dlq: &str,
        delivery: &Delivery,
        attempts: u32,
        reason: &str,
    ) -> Result<(), lapin::Error> {
        channel
            .queue_declare(
                dlq,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let properties = retry::stamped_properties(&delivery.properties, attempts + 1, reason);
        let confirm = channel
            .basic_publish(
                "",
                dlq,
                BasicPublishOptions::default(),
                &delivery.data,
                properties,
            )
            .await;
        flatten_confirm(confirm).await
    }
}

async fn close_channel(channel: &Channel, queue_name: &str) {
    if let Err(error) = channel.close(200, "shutdown").await {
        debug!(queue = %queue_name, error = %error, "Channel close failed");
    }
}

async fn flatten_confirm(
    publish: Result<lapin::publisher_confirm::PublisherConfirm, lapin::Error>,
) -> Result<(), lapin::Error> {
    publish?.await.map(|_| ())
}

async fn ack_or_warn(delivery: &Delivery, queue_name: &str) {
    if let Err(error) = delivery.ack(BasicAckOptions::default()).await {
        warn!(queue = %queue_name, error = %error, "Ack failed");
    }
}

async fn nack_requeue(delivery: &Delivery, queue_name: &str) {
    let options = BasicNackOptions {
        requeue: true,
        ..Default::default()
    };
    if let Err(error) = delivery.nack(options).await {
        warn!(queue = %queue_name, error = %error, "Nack failed");
    }
}
