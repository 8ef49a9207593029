//! Outbound email for Murmur.
//!
//! Handlers depend only on the [`Mailer`] trait. The server picks
//! [`ResendMailer`] when an API key is configured and falls back to
//! [`LogMailer`], which writes the message to the log instead of sending it.

pub mod log;
pub mod resend;
pub mod template;

use async_trait::async_trait;

pub use log::LogMailer;
pub use resend::ResendMailer;

/// A fully rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Delivery collaborator. A returned error means the provider did not
/// accept the message; there is no retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}
