//! Symbol to security-id resolution for the Dhan bridge.
//!
//! Alerts name instruments by ticker; the broker wants its own numeric
//! security id. This crate maps one to the other through a chain of tiers
//! that get slower and more authoritative as they go:
//!
//! - memory: a process-lifetime map of keys already resolved
//! - dataset: a CSV file of known instruments, loaded at startup
//! - remote: the broker's full instrument catalog, with write-back
//! - static fallback: a small built-in table for when no dataset exists
//!
//! # Modules
//!
//! - [`errors`] - Error types and failure classification
//! - [`models`] - Records, keys, dataset views and resolution results
//! - [`store`] - The file-backed dataset store
//! - [`provisioner`] - Startup provisioning and refresh of the dataset
//! - [`remote`] - Broker catalog clients and bounded lookups
//! - [`resolver`] - The tiered resolution cache

pub mod errors;
pub mod models;
pub mod provisioner;
pub mod remote;
pub mod resolver;
pub mod store;

pub use errors::{FailureKind, Result, SymbolError};
pub use models::{
    Dataset, DatasetOrigin, DatasetSummary, InstrumentRecord, ResolutionKey, ResolvedSecurity,
    Tier,
};
pub use provisioner::{
    DatasetDownloader, DatasetProvisioner, HttpDatasetDownloader, ProvisionPolicy,
    ProvisionReport,
};
pub use remote::{
    CatalogPayload, DhanCatalogClient, InstrumentCatalog, LookupOutcome, RemoteLookupClient,
    RemoteLookupConfig,
};
pub use resolver::{NotFound, Resolution, ResolutionCache, ResolutionDiagnostics, StaticSymbolTable};
pub use store::DatasetStore;
