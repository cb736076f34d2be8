//! Symbol resolution models
//!
//! - `record` - Dataset rows (InstrumentRecord) and the lookup key (ResolutionKey)
//! - `dataset` - The in-process dataset view and its origin metadata
//! - `resolution` - Tiers and successful resolution results

mod dataset;
mod record;
mod resolution;

pub use dataset::{Dataset, DatasetOrigin, DatasetSummary};
pub use record::{InstrumentRecord, ResolutionKey};
pub use resolution::{ResolvedSecurity, Tier};
