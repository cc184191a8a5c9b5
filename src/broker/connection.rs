use crate::config::BrokerSettings;
use lapin::{Channel, Connection, ConnectionProperties};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Connection error: {0}")]
    Connection(lapin::Error),

    #[error("Channel creation failed: {0}")]
    Channel(lapin::Error),
}

/// Single shared connection to the AMQP broker.
///
/// The connection is created lazily on first use and re-created when the
/// broker drops it. The inner mutex guarantees that racing callers never dial
/// more than one connection. Channel creation is the only operation exposed:
/// callers own their channels exclusively and never share them across tasks.
pub struct BrokerConnection {
    settings: BrokerSettings,
    connection: Mutex<Option<Connection>>,
}

impl BrokerConnection {
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            connection: Mutex::new(None),
        }
    }

    /// Open a new channel, establishing the connection first if needed.
    pub async fn create_channel(&self) -> Result<Channel, BrokerError> {
        let mut guard = self.connection.lock().await;

        // A dead connection is dropped here and replaced by a fresh dial
        let connection = match guard.take() {
            Some(connection) if connection.status().connected() => guard.insert(connection),
            _ => guard.insert(self.connect().await?),
        };

        connection
            .create_channel()
            .await
            .map_err(BrokerError::Channel)
    }

    async fn connect(&self) -> Result<Connection, BrokerError> {
        let uri = self.settings.amqp_uri();
        info!(
            host = %self.settings.host,
            port = self.settings.port,
            vhost = %self.settings.vhost,
            "Connecting to broker"
        );

        Connection::connect(&uri, ConnectionProperties::default())
            .await
            .map_err(BrokerError::Connection)
    }

    /// Close the connection gracefully. Called once at process shutdown;
    /// a no-op if the connection was never established.
    pub async fn close(&self) {
        let mut guard = self.connection.lock().await;
        if let Some(connection) = guard.take() {
            if let Err(error) = connection.close(200, "shutdown").await {
                warn!(error = %error, "Broker connection close failed");
            } else {
                info!("Broker connection closed");
            }
        }
    }
}
