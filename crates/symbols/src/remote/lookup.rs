use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use super::InstrumentCatalog;
use crate::errors::SymbolError;
use crate::models::ResolutionKey;

/// Default bound on one catalog round-trip.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for the remote tier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RemoteLookupConfig {
    pub timeout: Duration,
}

impl RemoteLookupConfig {
    pub fn from_millis(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

impl Default for RemoteLookupConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

/// Result of asking the brokerage about one key.
#[derive(Debug)]
pub enum LookupOutcome {
    /// The catalog lists the key under this security id.
    Found(String),
    /// The catalog was retrieved but does not list the key.
    NotListed { catalog_entries: usize },
    /// The catalog could not be retrieved or interpreted.
    Failed(SymbolError),
}

/// Bounded, single-shot lookups against an [`InstrumentCatalog`].
#[derive(Clone)]
pub struct RemoteLookupClient {
    catalog: Arc<dyn InstrumentCatalog>,
    timeout: Duration,
}

impl RemoteLookupClient {
    pub fn new(catalog: Arc<dyn InstrumentCatalog>) -> Self {
        Self::with_config(catalog, RemoteLookupConfig::default())
    }

    pub fn with_config(catalog: Arc<dyn InstrumentCatalog>, config: RemoteLookupConfig) -> Self {
        Self {
            catalog,
            timeout: config.timeout,
        }
    }

    pub fn catalog_id(&self) -> &'static str {
        self.catalog.id()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Look up `key`. Never retries.
    pub async fn lookup(&self, key: &ResolutionKey) -> LookupOutcome {
        let fetched = tokio::time::timeout(self.timeout, self.catalog.fetch_catalog()).await;

        let payload = match fetched {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                warn!("{} catalog lookup for {} failed: {}", self.catalog.id(), key, e);
                return LookupOutcome::Failed(e);
            }
            Err(_) => {
                let e = SymbolError::CatalogTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                warn!("{} catalog lookup for {}: {}", self.catalog.id(), key, e);
                return LookupOutcome::Failed(e);
            }
        };

        match payload.find_security_id(key) {
            Ok(Some(security_id)) => {
                debug!("{} catalog lists {} as {}", self.catalog.id(), key, security_id);
                LookupOutcome::Found(security_id)
            }
            Ok(None) => LookupOutcome::NotListed {
                catalog_entries: payload.len(),
            },
            Err(e) => {
                warn!("{} catalog is unusable: {}", self.catalog.id(), e);
                LookupOutcome::Failed(e)
            }
        }
    }
}
