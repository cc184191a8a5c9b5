//! Handler system for TaskBox
//!
//! ## Key Components
//!
//! - [`TaskHandler`] - trait for the unit of domain logic bound to one queue
//! - [`HandlerFactory`] - builds a fresh handler instance per delivery
//! - [`HandlerRegistry`] - maps queue names to factories, rejecting duplicates
//!
//! ## Example
//!
//! ```rust,ignore
//! use taskbox::handlers::HandlerRegistry;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(Arc::new(MailHandlerFactory::new(settings, sender)))?;
//!
//! let handler = registry.resolve("taskbox.mail")?;
//! handler.process(&delivery.data).await?;
//! ```

mod registry;
mod traits;

pub use registry::{HandlerRegistry, RegistryError};
pub use traits::{HandlerError, HandlerFactory, TaskHandler};
