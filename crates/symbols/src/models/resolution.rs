use std::fmt;

use serde::Serialize;

/// One layer of the resolution cache, in the order it is consulted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Memory,
    Dataset,
    Remote,
    StaticFallback,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Dataset => write!(f, "dataset"),
            Self::Remote => write!(f, "remote"),
            Self::StaticFallback => write!(f, "static-fallback"),
        }
    }
}

/// A successful resolution.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSecurity {
    /// Broker security identifier, passed on untouched to order placement.
    pub security_id: String,
    /// The tier that produced it.
    pub tier: Tier,
}
