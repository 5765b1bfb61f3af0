//! Outbound mail port
//!
//! Delivery is an external collaborator: the core only ever calls
//! `send(subject, message, recipient)` and imposes no retry contract.
//! Confirmation-code delivery is fire-and-forget; a failure is logged and
//! does not roll back the signup that triggered it.

use async_trait::async_trait;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, message: &str, recipient: &str) -> anyhow::Result<()>;
}

/// Default mailer: records the delivery in the log stream. Stands in for a
/// real transport in development and in the test suites.
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    pub from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, subject: &str, message: &str, recipient: &str) -> anyhow::Result<()> {
        tracing::info!(
            from = %self.from,
            to = %recipient,
            subject,
            body = message,
            "outbound mail"
        );
        Ok(())
    }
}
