//! Message dispatch
//!
//! The [`Dispatcher`] drives one consumer loop per registered handler and
//! enforces the delivery contract: ack on handler success, bounded retry with
//! a dead-letter queue on failure (`retry` module), nack-with-requeue when
//! the retry path itself is unavailable. At-least-once delivery holds on
//! every path.

mod dispatcher;
pub mod retry;

pub use dispatcher::{DispatchError, Dispatcher};
pub use retry::FailureAction;
