//! Dhan instrument catalog client.
//!
//! Dhan publishes its scrip master as a CSV file. Some mirrors serve the same
//! content as JSON; [`CatalogPayload::parse`] accepts both.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};

use super::{CatalogPayload, InstrumentCatalog};
use crate::errors::{Result, SymbolError};

const CATALOG_ID: &str = "DHAN";

/// Fetches the Dhan scrip master.
pub struct DhanCatalogClient {
    client: Client,
    url: String,
    client_id: Option<String>,
    access_token: Option<String>,
}

impl DhanCatalogClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            client_id: None,
            access_token: None,
        }
    }

    /// Attach brokerage credentials. Blank values are not sent.
    pub fn with_credentials(
        mut self,
        client_id: Option<String>,
        access_token: Option<String>,
    ) -> Self {
        self.client_id = client_id.filter(|v| !v.trim().is_empty());
        self.access_token = access_token.filter(|v| !v.trim().is_empty());
        self
    }
}

#[async_trait]
impl InstrumentCatalog for DhanCatalogClient {
    fn id(&self) -> &'static str {
        CATALOG_ID
    }

    async fn fetch_catalog(&self) -> Result<CatalogPayload> {
        debug!("Fetching instrument catalog from {}", self.url);

        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.access_token {
            request = request.header("access-token", token);
        }
        if let Some(client_id) = &self.client_id {
            request = request.header("client-id", client_id);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SymbolError::Catalog {
                message: format!("catalog rejected credentials: {}", status),
            });
        }
        if !status.is_success() {
            return Err(SymbolError::Catalog {
                message: format!("HTTP error: {}", status),
            });
        }

        let body = response.bytes().await?;
        let payload = CatalogPayload::parse(&body)?;
        debug!("Catalog from {} holds {} entries", self.url, payload.len());
        Ok(payload)
    }
}
