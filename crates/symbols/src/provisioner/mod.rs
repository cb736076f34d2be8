//! Startup provisioning of the security dataset.
//!
//! Decides where the dataset comes from before any request is served:
//!
//! ```text
//! local file present and fresh? ──yes──> load it                  (local)
//!          │ no
//!          ▼
//! download URL configured and download ok? ──yes──> install it    (downloaded)
//!          │ no
//!          ▼
//! local file present (expired)? ──yes──> load it anyway           (local, stale)
//!          │ no
//!          ▼
//! write a header-only shell                                       (empty)
//! ```
//!
//! Under [`ProvisionPolicy::PresenceOnly`] a local file is always fresh.
//! Under [`ProvisionPolicy::Expiring`] it is fresh only while younger than
//! `max_age`; an expired copy still beats having nothing.

mod downloader;

pub use downloader::{DatasetDownloader, HttpDatasetDownloader};

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use tokio::task;

use crate::errors::{Result, SymbolError};
use crate::models::{Dataset, DatasetOrigin};
use crate::store::DatasetStore;

/// When a local dataset file may be used without re-downloading.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ProvisionPolicy {
    /// Any existing file is used as-is. Suited to an operator-curated file.
    #[default]
    PresenceOnly,
    /// A file older than `max_age` triggers a download attempt first.
    Expiring { max_age: Duration },
}

impl ProvisionPolicy {
    pub fn expiring_hours(hours: u64) -> Self {
        Self::Expiring {
            max_age: Duration::from_secs(hours.saturating_mul(60 * 60)),
        }
    }

    pub fn max_age(&self) -> Option<Duration> {
        match self {
            Self::PresenceOnly => None,
            Self::Expiring { max_age } => Some(*max_age),
        }
    }

    pub fn is_fresh(&self, age: Duration) -> bool {
        match self {
            Self::PresenceOnly => true,
            Self::Expiring { max_age } => age < *max_age,
        }
    }
}

/// Outcome of a provisioning run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionReport {
    pub origin: DatasetOrigin,
    pub records: usize,
    /// The view is an expired local copy kept because no fresh one was available.
    pub stale: bool,
    pub download_error: Option<String>,
    pub load_error: Option<String>,
}

impl ProvisionReport {
    fn new(dataset: &Dataset, stale: bool, download_error: Option<String>) -> Self {
        Self {
            origin: dataset.origin(),
            records: dataset.len(),
            stale,
            download_error,
            load_error: dataset.load_error_message().map(str::to_string),
        }
    }
}

/// Ensures a usable dataset is installed in the store.
pub struct DatasetProvisioner {
    store: Arc<DatasetStore>,
    downloader: Arc<dyn DatasetDownloader>,
    download_url: Option<String>,
    policy: ProvisionPolicy,
}

impl DatasetProvisioner {
    pub fn new(
        store: Arc<DatasetStore>,
        downloader: Arc<dyn DatasetDownloader>,
        download_url: Option<String>,
        policy: ProvisionPolicy,
    ) -> Self {
        Self {
            store,
            downloader,
            download_url: download_url.filter(|url| !url.trim().is_empty()),
            policy,
        }
    }

    pub fn policy(&self) -> ProvisionPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    /// True when a refresh has somewhere to download from.
    pub fn has_download_url(&self) -> bool {
        self.download_url.is_some()
    }

    /// Run the startup sequence. Never fails; the worst case is an empty view.
    pub async fn provision(&self) -> ProvisionReport {
        let local_age = self.store.file_age();

        if let Some(age) = local_age {
            if self.policy.is_fresh(age) {
                let dataset = self.store.load();
                return ProvisionReport::new(&dataset, false, None);
            }
            info!(
                "Local dataset {} is {} min old, past the {} min threshold",
                self.store.path().display(),
                age.as_secs() / 60,
                self.policy.max_age().unwrap_or_default().as_secs() / 60
            );
        }

        let download_error = match self.download().await {
            Ok(dataset) => return ProvisionReport::new(&dataset, false, None),
            Err(SymbolError::NoDownloadUrl) => None,
            Err(e) => {
                warn!("Dataset download failed: {}", e);
                Some(e.to_string())
            }
        };

        if local_age.is_some() {
            warn!(
                "Falling back to expired local dataset {}",
                self.store.path().display()
            );
            let dataset = self.store.load();
            return ProvisionReport::new(&dataset, true, download_error);
        }

        info!("No dataset available, resolution will rely on the remote catalog");
        let dataset = match self.store.create_empty() {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!("Failed to create empty dataset: {}", e);
                self.store.snapshot()
            }
        };
        ProvisionReport::new(&dataset, false, download_error)
    }

    /// Force a download regardless of the local file's age.
    ///
    /// On failure the current view stays in service.
    pub async fn refresh(&self) -> ProvisionReport {
        match self.download().await {
            Ok(dataset) => ProvisionReport::new(&dataset, false, None),
            Err(e) => {
                warn!("Dataset refresh failed, keeping current view: {}", e);
                let stale = self
                    .store
                    .file_age()
                    .map(|age| !self.policy.is_fresh(age))
                    .unwrap_or(false);
                ProvisionReport::new(&self.store.snapshot(), stale, Some(e.to_string()))
            }
        }
    }

    async fn download(&self) -> Result<Arc<Dataset>> {
        let url = self
            .download_url
            .as_deref()
            .ok_or(SymbolError::NoDownloadUrl)?;
        let body = self.downloader.download(url).await?;

        // Parsing a full scrip master takes long enough to stall the runtime.
        let store = self.store.clone();
        task::spawn_blocking(move || store.install_download(&body)).await?
    }
}
