use std::sync::Arc;

use chrono::{DateTime, Utc};
use dhanbridge_symbols::{
    DatasetDownloader, DatasetProvisioner, DatasetStore, DhanCatalogClient, HttpDatasetDownloader,
    InstrumentCatalog, RemoteLookupClient, ResolutionCache, StaticSymbolTable,
};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    broker::{DhanOrderClient, OrderGateway},
    config::Config,
    secrets::Credentials,
};

pub struct AppState {
    pub resolver: Arc<ResolutionCache>,
    pub provisioner: Arc<DatasetProvisioner>,
    /// `None` when broker credentials are missing.
    pub orders: Option<Arc<dyn OrderGateway>>,
    pub broker_error: Option<String>,
    pub credentials: Credentials,
    pub started_at: DateTime<Utc>,
}

/// External services the bridge talks to. Tests substitute fakes.
pub struct Collaborators {
    pub catalog: Option<Arc<dyn InstrumentCatalog>>,
    pub downloader: Arc<dyn DatasetDownloader>,
    pub orders: Option<Arc<dyn OrderGateway>>,
}

impl Collaborators {
    /// The production Dhan clients for `config` and `credentials`.
    pub fn dhan(config: &Config, credentials: &Credentials) -> Self {
        let catalog = DhanCatalogClient::new(config.scrip_master_url.clone()).with_credentials(
            credentials.client_id.clone(),
            credentials.access_token.clone(),
        );

        let orders = credentials.has_broker_access().then(|| {
            Arc::new(DhanOrderClient::new(
                config.dhan_api_base_url.clone(),
                credentials.client_id.clone().unwrap_or_default(),
                credentials.access_token.clone().unwrap_or_default(),
            )) as Arc<dyn OrderGateway>
        });

        Self {
            catalog: Some(Arc::new(catalog)),
            downloader: Arc::new(HttpDatasetDownloader::new()),
            orders,
        }
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("BRIDGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let credentials = Credentials::load(config.secret_file.as_deref());
    let collaborators = Collaborators::dhan(config, &credentials);
    build_state_with(config, credentials, collaborators).await
}

/// Provision the dataset and assemble the resolver. Runs before the listener
/// accepts traffic.
pub async fn build_state_with(
    config: &Config,
    credentials: Credentials,
    collaborators: Collaborators,
) -> anyhow::Result<Arc<AppState>> {
    let store = Arc::new(DatasetStore::new(&config.dataset_path));
    let provisioner = Arc::new(DatasetProvisioner::new(
        store.clone(),
        collaborators.downloader,
        config.download_url.clone(),
        config.provision_policy(),
    ));

    let report = provisioner.provision().await;
    info!(
        "Dataset ready: origin={} records={} stale={}",
        report.origin, report.records, report.stale
    );
    if let Some(error) = &report.download_error {
        warn!("Dataset download failed during startup: {}", error);
    }

    let mut resolver = ResolutionCache::new(store);
    if let Some(catalog) = collaborators.catalog {
        resolver = resolver.with_remote(RemoteLookupClient::with_config(
            catalog,
            config.remote_lookup(),
        ));
    }
    if config.static_fallback {
        resolver = resolver.with_static_fallback(StaticSymbolTable::builtin());
    }

    let broker_error = match collaborators.orders {
        Some(_) => None,
        None => {
            let error = "Missing CLIENT_ID or ACCESS_TOKEN".to_string();
            warn!("Order placement disabled: {}", error);
            Some(error)
        }
    };

    Ok(Arc::new(AppState {
        resolver: Arc::new(resolver),
        provisioner,
        orders: collaborators.orders,
        broker_error,
        credentials,
        started_at: Utc::now(),
    }))
}
