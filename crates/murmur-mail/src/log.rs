use async_trait::async_trait;
use tracing::info;

use crate::{Mailer, OutgoingEmail};

/// Development mailer: logs the plain-text body and reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "Email not sent (log mailer):\n{}", email.text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds() {
        let email = OutgoingEmail {
            to: "alice@example.com".into(),
            subject: "hi".into(),
            html: "<p>hi</p>".into(),
            text: "hi".into(),
        };
        assert!(LogMailer.send(&email).await.is_ok());
    }
}
