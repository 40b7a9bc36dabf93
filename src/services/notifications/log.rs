use async_trait::async_trait;

use super::{Notifier, OutboundEmail};

/// Writes notifications to the log instead of sending them. Used when no mail
/// relay is configured.
pub struct LogMailer;

#[async_trait]
impl Notifier for LogMailer {
    async fn send(&self, email: &OutboundEmail) -> anyhow::Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "notification (not sent, no mail relay configured)");
        Ok(())
    }
}
