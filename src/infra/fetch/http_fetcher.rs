use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

use crate::core::pipeline::{FetchError, FileFetcher};

/// Downloads input files with a plain GET and a fixed timeout.
pub struct HttpFileFetcher {
    client: Client,
}

impl HttpFileFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        tokio::fs::write(destination, &body)
            .await
            .map_err(|e| FetchError::Write {
                path: destination.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(url, path = %destination.display(), bytes = body.len(), "Downloaded file");
        Ok(())
    }
}
