//! Built-in last-resort symbol table.
//!
//! Loads `static_symbols.json` at compile time via `include_str!` and indexes
//! it once via `lazy_static`. Entries are constants: they are never written to
//! the dataset and never learned at runtime.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::Deserialize;

use crate::models::{InstrumentRecord, ResolutionKey};

#[derive(Debug, Deserialize)]
struct StaticCatalog {
    symbols: Vec<InstrumentRecord>,
}

lazy_static! {
    static ref BUILTIN: StaticSymbolTable = {
        let json = include_str!("static_symbols.json");
        let catalog: StaticCatalog =
            serde_json::from_str(json).expect("static_symbols.json must be valid");
        StaticSymbolTable::from_records(catalog.symbols)
    };
}

/// Fixed mapping consulted only when the dataset is unavailable.
#[derive(Clone, Debug, Default)]
pub struct StaticSymbolTable {
    entries: HashMap<ResolutionKey, String>,
}

impl StaticSymbolTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// First record per key wins.
    pub fn from_records(records: impl IntoIterator<Item = InstrumentRecord>) -> Self {
        let mut entries = HashMap::new();
        for record in records {
            entries
                .entry(record.key())
                .or_insert(record.security_id);
        }
        Self { entries }
    }

    pub fn get(&self, key: &ResolutionKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
