//! AMQP broker integration
//!
//! One long-lived connection per process, shared by the [`Producer`] and the
//! dispatcher's consumer loops. Channels are created on demand and owned by
//! exactly one publish call or one consumer loop at a time.

mod connection;
mod producer;

pub use connection::{BrokerConnection, BrokerError};
pub use producer::{Producer, PublishError};
