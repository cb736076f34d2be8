//! Per-tier diagnostics attached to a failed resolution.

use serde::Serialize;
use thiserror::Error;

use crate::errors::{FailureKind, SymbolError};
use crate::models::{ResolutionKey, ResolvedSecurity, Tier};

/// What happened when one tier was consulted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TierOutcome {
    Hit,
    Miss,
    /// The tier was not consulted.
    Skipped { reason: String },
    /// The tier failed; resolution moved on.
    Failed { kind: FailureKind, message: String },
}

/// Record of a single tier attempt.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TierAttempt {
    pub tier: Tier,
    #[serde(flatten)]
    pub outcome: TierOutcome,
}

/// Ordered trace of the tiers tried for one key.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolutionDiagnostics {
    pub attempts: Vec<TierAttempt>,
}

impl ResolutionDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self, tier: Tier) {
        self.push(tier, TierOutcome::Hit);
    }

    pub fn record_miss(&mut self, tier: Tier) {
        self.push(tier, TierOutcome::Miss);
    }

    pub fn record_skip(&mut self, tier: Tier, reason: impl Into<String>) {
        self.push(
            tier,
            TierOutcome::Skipped {
                reason: reason.into(),
            },
        );
    }

    pub fn record_failure(&mut self, tier: Tier, error: &SymbolError) {
        self.push(
            tier,
            TierOutcome::Failed {
                kind: error.kind(),
                message: error.to_string(),
            },
        );
    }

    fn push(&mut self, tier: Tier, outcome: TierOutcome) {
        self.attempts.push(TierAttempt { tier, outcome });
    }

    /// Outcome recorded for `tier`, if it was reached.
    pub fn outcome(&self, tier: Tier) -> Option<&TierOutcome> {
        self.attempts
            .iter()
            .find(|a| a.tier == tier)
            .map(|a| &a.outcome)
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| match &a.outcome {
                TierOutcome::Hit => format!("{}: HIT", a.tier),
                TierOutcome::Miss => format!("{}: MISS", a.tier),
                TierOutcome::Skipped { reason } => format!("{}: SKIPPED ({})", a.tier, reason),
                TierOutcome::Failed { kind, message } => {
                    format!("{}: FAILED [{}] ({})", a.tier, kind, message)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Every tier missed.
///
/// This is an expected outcome (an unknown ticker), not a system fault.
#[derive(Clone, Debug, Error, Serialize)]
#[error("Symbol '{symbol}' not found")]
pub struct NotFound {
    pub symbol: String,
    pub instrument: String,
    pub exchange: String,
    /// Rows in the dataset view when resolution gave up.
    pub dataset_records: usize,
    pub diagnostics: ResolutionDiagnostics,
}

impl NotFound {
    pub(crate) fn new(
        key: &ResolutionKey,
        dataset_records: usize,
        diagnostics: ResolutionDiagnostics,
    ) -> Self {
        Self {
            symbol: key.trading_symbol.clone(),
            instrument: key.instrument_type.clone(),
            exchange: key.exchange.clone(),
            dataset_records,
            diagnostics,
        }
    }
}

/// Outcome of [`ResolutionCache::resolve`](super::ResolutionCache::resolve).
pub type Resolution = std::result::Result<ResolvedSecurity, NotFound>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = ResolutionDiagnostics::new();
        diag.record_miss(Tier::Memory);
        diag.record_miss(Tier::Dataset);
        diag.record_failure(Tier::Remote, &SymbolError::CatalogTimeout { timeout_ms: 100 });
        diag.record_skip(Tier::StaticFallback, "dataset available");

        let summary = diag.summary();
        assert!(summary.starts_with("memory: MISS -> dataset: MISS"));
        assert!(summary.contains("remote: FAILED [transient]"));
        assert!(summary.contains("static-fallback: SKIPPED (dataset available)"));
    }

    #[test]
    fn test_outcome_lookup() {
        let mut diag = ResolutionDiagnostics::new();
        diag.record_miss(Tier::Memory);
        diag.record_hit(Tier::Dataset);

        assert_eq!(diag.outcome(Tier::Dataset), Some(&TierOutcome::Hit));
        assert_eq!(diag.outcome(Tier::Remote), None);
    }

    #[test]
    fn test_serialized_attempts() {
        let mut diag = ResolutionDiagnostics::new();
        diag.record_miss(Tier::Memory);
        diag.record_skip(Tier::Remote, "not configured");

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "tier": "memory", "outcome": "miss" },
                { "tier": "remote", "outcome": "skipped", "reason": "not configured" }
            ])
        );
    }

    #[test]
    fn test_not_found_message() {
        let key = ResolutionKey::new("WIPRO", "EQ", "NSE");
        let error = NotFound::new(&key, 42, ResolutionDiagnostics::new());

        assert_eq!(error.to_string(), "Symbol 'WIPRO' not found");
        assert_eq!(error.dataset_records, 42);
        assert_eq!(error.instrument, "EQ");
    }
}
