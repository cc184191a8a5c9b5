//! Outbound email: the reference producer+consumer pairing for one task type
//!
//! [`Mailer`] enqueues [`EmailTask`]s on the mail queue; [`MailHandler`]
//! consumes them and sends through the [`EmailSender`] collaborator.

mod handler;
mod smtp;
mod task;

pub use handler::{MailHandler, MailHandlerFactory, Mailer};
pub use smtp::{EmailSender, MailError, MockEmailSender, SmtpEmailSender};
pub use task::EmailTask;
