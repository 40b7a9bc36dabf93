use anyhow::Context;
use async_trait::async_trait;

use super::{Notifier, OutboundEmail};

/// Delivers mail through an HTTP relay that accepts
/// `{"from","to","subject","text"}` with a bearer key.
pub struct HttpMailer {
    endpoint: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: String, from: String) -> Self {
        Self {
            endpoint,
            api_key,
            from,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, email: &OutboundEmail) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "from": self.from,
            "to": email.to,
            "subject": email.subject,
            "text": email.text,
        });

        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("failed to reach mail relay")?
            .error_for_status()
            .context("mail relay returned error")?;

        tracing::debug!(to = %email.to, "notification sent");
        Ok(())
    }
}
