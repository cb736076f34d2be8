use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::Client;

use crate::errors::{Result, SymbolError};

/// Default timeout for a full dataset download. Scrip masters run to tens of
/// megabytes, so this is far looser than the per-lookup bound.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Fetches the raw bytes of a dataset file.
#[async_trait]
pub trait DatasetDownloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Downloads datasets over HTTP(S).
pub struct HttpDatasetDownloader {
    client: Client,
}

impl HttpDatasetDownloader {
    pub fn new() -> Self {
        Self::with_timeout(DOWNLOAD_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

impl Default for HttpDatasetDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatasetDownloader for HttpDatasetDownloader {
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading dataset from {}", url);

        let failed = |message: String| SymbolError::Download {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP error: {}", response.status())));
        }

        let body = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        info!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}
