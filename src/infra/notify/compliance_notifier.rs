use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::core::pipeline::{CompletionNotifier, CompletionPayload, NotifyError};

/// Posts the completion payload as JSON to the compliance service.
pub struct ComplianceNotifier {
    client: Client,
    url: String,
}

impl ComplianceNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionNotifier for ComplianceNotifier {
    async fn notify(&self, payload: &CompletionPayload) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        tracing::info!(
            session_id = %payload.session_id,
            url = %self.url,
            status = status.as_u16(),
            "Sent completion callback"
        );
        Ok(())
    }
}
