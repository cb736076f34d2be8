use serde::Serialize;

/// Classification of a tier failure.
///
/// Used when recording diagnostics for a resolution attempt. None of these
/// stop resolution; they only explain why a tier produced nothing.
///
/// | Kind | Typical cause | Next step |
/// |------|---------------|-----------|
/// | `Transient` | timeout, network, HTTP error | fall through, retry on next request |
/// | `Configuration` | missing URL or credentials | fall through, operator action |
/// | `Data` | malformed file or catalog | fall through, operator action |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Network, timeout or transport failure. May succeed on a later request.
    Transient,

    /// Something the operator has not configured (or configured wrongly).
    Configuration,

    /// The data itself is unusable: unreadable file, missing columns,
    /// unparseable catalog body.
    Data,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Configuration => write!(f, "configuration"),
            Self::Data => write!(f, "data"),
        }
    }
}
