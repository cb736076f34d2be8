use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of the security dataset.
///
/// `(exchange, trading_symbol, series)` is the candidate key. The security id
/// is broker-assigned and treated as an opaque string.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentRecord {
    pub exchange: String,
    pub trading_symbol: String,
    pub series: String,
    pub security_id: String,
}

impl InstrumentRecord {
    pub fn new(
        exchange: impl Into<String>,
        trading_symbol: impl Into<String>,
        series: impl Into<String>,
        security_id: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            trading_symbol: trading_symbol.into(),
            series: series.into(),
            security_id: security_id.into(),
        }
    }

    /// Build the record learned for `key`.
    pub fn from_key(key: &ResolutionKey, security_id: impl Into<String>) -> Self {
        Self::new(
            key.exchange.clone(),
            key.trading_symbol.clone(),
            key.instrument_type.clone(),
            security_id,
        )
    }

    pub fn key(&self) -> ResolutionKey {
        ResolutionKey {
            trading_symbol: self.trading_symbol.clone(),
            instrument_type: self.series.clone(),
            exchange: self.exchange.clone(),
        }
    }

    /// Exact, case-sensitive match against a resolution key.
    pub fn matches(&self, key: &ResolutionKey) -> bool {
        self.exchange == key.exchange
            && self.trading_symbol == key.trading_symbol
            && self.series == key.instrument_type
    }
}

/// The lookup key shared by the memory and dataset tiers.
///
/// Compared by exact string equality. Callers normalise (for example
/// upper-case the symbol) before building a key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionKey {
    pub trading_symbol: String,
    pub instrument_type: String,
    pub exchange: String,
}

impl ResolutionKey {
    /// Arguments follow the order of `resolve(symbol, instrument, exchange)`.
    pub fn new(
        trading_symbol: impl Into<String>,
        instrument_type: impl Into<String>,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            trading_symbol: trading_symbol.into(),
            instrument_type: instrument_type.into(),
            exchange: exchange.into(),
        }
    }
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.exchange, self.trading_symbol, self.instrument_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_matches_exact_key() {
        let record = InstrumentRecord::new("NSE", "INFY", "EQ", "1594");

        assert!(record.matches(&ResolutionKey::new("INFY", "EQ", "NSE")));
        assert!(!record.matches(&ResolutionKey::new("infy", "EQ", "NSE")));
        assert!(!record.matches(&ResolutionKey::new("INFY", "BE", "NSE")));
        assert!(!record.matches(&ResolutionKey::new("INFY", "EQ", "BSE")));
    }

    #[test]
    fn test_key_round_trips_through_record() {
        let key = ResolutionKey::new("TCS", "EQ", "NSE");
        let record = InstrumentRecord::from_key(&key, "11536");

        assert_eq!(record.exchange, "NSE");
        assert_eq!(record.series, "EQ");
        assert_eq!(record.key(), key);
    }

    #[test]
    fn test_key_display() {
        let key = ResolutionKey::new("INFY", "EQ", "NSE");
        assert_eq!(key.to_string(), "NSE:INFY:EQ");
    }
}
