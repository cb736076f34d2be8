//! Remote lookup against the brokerage instrument catalog.
//!
//! - `catalog` - Catalog payload shapes and key matching
//! - `traits` - The [`InstrumentCatalog`] seam
//! - `dhan` - HTTP client for the Dhan scrip master
//! - `lookup` - Time-bounded single-key lookups

mod catalog;
mod dhan;
mod lookup;
mod traits;

pub use catalog::{CatalogPayload, CatalogRow, CatalogTable};
pub use dhan::DhanCatalogClient;
pub use lookup::{LookupOutcome, RemoteLookupClient, RemoteLookupConfig, DEFAULT_LOOKUP_TIMEOUT};
pub use traits::InstrumentCatalog;
