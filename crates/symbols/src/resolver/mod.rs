//! Tiered symbol resolution.
//!
//! - `cache` - The [`ResolutionCache`] orchestrator
//! - `diagnostics` - Per-tier outcomes and the [`NotFound`] result
//! - `static_table` - Built-in last-resort mapping

mod cache;
mod diagnostics;
mod static_table;

pub use cache::ResolutionCache;
pub use diagnostics::{NotFound, Resolution, ResolutionDiagnostics, TierAttempt, TierOutcome};
pub use static_table::StaticSymbolTable;
