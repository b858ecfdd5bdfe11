//! Source fetcher - retrieves original asset bytes over HTTP.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use mediaforge_core::PipelineError;

/// Retrieves the bytes of a source asset from its URL.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the whole body into memory (thumbnail-sized payloads).
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, PipelineError>;

    /// Stream the body to a local file and return the byte count
    /// (video sources can be large).
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, PipelineError>;
}

/// HTTP fetcher over a shared reqwest client. Redirects are followed by
/// the client's default policy.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn get_checked(&self, url: &str) -> Result<reqwest::Response, PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Download(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Download(format!(
                "HTTP {} fetching {}",
                response.status(),
                url
            )));
        }

        Ok(response)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, PipelineError> {
        let response = self.get_checked(url).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Download(format!("Failed to read body from {}: {}", url, e)))?;

        tracing::debug!(url = %url, size_bytes = bytes.len(), "Source fetch complete");

        Ok(bytes)
    }

    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, PipelineError> {
        let response = self.get_checked(url).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| PipelineError::Download(format!("Stream from {} failed: {}", url, e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;

        tracing::debug!(url = %url, size_bytes = written, "Source download complete");

        Ok(written)
    }
}
