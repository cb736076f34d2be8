use async_trait::async_trait;

use super::CatalogPayload;
use crate::errors::Result;

/// Source of the brokerage's full instrument catalog.
///
/// Implementations return the catalog as received; matching a key against it
/// is done by [`CatalogPayload::find_security_id`].
#[async_trait]
pub trait InstrumentCatalog: Send + Sync {
    /// Short identifier used in logs and diagnostics.
    fn id(&self) -> &'static str;

    /// Fetch the whole catalog.
    async fn fetch_catalog(&self) -> Result<CatalogPayload>;
}
