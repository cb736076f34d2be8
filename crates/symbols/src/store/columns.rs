//! Column layout of the security dataset file.
//!
//! The header-only shell written by the store carries exactly the four
//! required columns. A downloaded scrip master carries dozens more, in any
//! order; the layout records where the four we need live so rows can be read
//! and appended without disturbing the others.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::errors::{Result, SymbolError};
use crate::models::InstrumentRecord;

pub const EXCHANGE_COLUMN: &str = "SEM_EXM_EXCH_ID";
pub const TRADING_SYMBOL_COLUMN: &str = "SEM_TRADING_SYMBOL";
pub const SERIES_COLUMN: &str = "SEM_SERIES";
pub const SECURITY_ID_COLUMN: &str = "SEM_SMST_SECURITY_ID";

/// Header of a freshly created dataset shell, in order.
pub const REQUIRED_COLUMNS: [&str; 4] = [
    EXCHANGE_COLUMN,
    TRADING_SYMBOL_COLUMN,
    SERIES_COLUMN,
    SECURITY_ID_COLUMN,
];

/// Positions of the required columns within a file's header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ColumnLayout {
    pub exchange: usize,
    pub trading_symbol: usize,
    pub series: usize,
    pub security_id: usize,
    /// Total number of columns in the header.
    pub width: usize,
}

impl ColumnLayout {
    /// Layout of the four-column shell.
    pub fn shell() -> Self {
        Self {
            exchange: 0,
            trading_symbol: 1,
            series: 2,
            security_id: 3,
            width: REQUIRED_COLUMNS.len(),
        }
    }

    /// Locate the required columns by name.
    ///
    /// Fails with [`SymbolError::MissingColumns`] listing every absent column,
    /// so a wrong file is rejected at load time rather than deep in a lookup.
    pub fn from_headers(headers: &StringRecord, source: &str) -> Result<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };

        let found: Vec<Option<usize>> = REQUIRED_COLUMNS
            .iter()
            .map(|name| position(*name))
            .collect();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .zip(&found)
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.to_string())
            .collect();

        match found.as_slice() {
            [Some(exchange), Some(trading_symbol), Some(series), Some(security_id)] => Ok(Self {
                exchange: *exchange,
                trading_symbol: *trading_symbol,
                series: *series,
                security_id: *security_id,
                width: headers.len(),
            }),
            _ => Err(SymbolError::MissingColumns {
                path: source.to_string(),
                missing,
            }),
        }
    }

    /// Extract a record from a data row. Rows without a symbol or an id are
    /// not usable for resolution and yield `None`.
    pub fn record(&self, row: &StringRecord) -> Option<InstrumentRecord> {
        let cell = |idx: usize| row.get(idx).unwrap_or("").trim();

        let trading_symbol = cell(self.trading_symbol);
        let security_id = normalize_security_id(cell(self.security_id));
        if trading_symbol.is_empty() || security_id.is_empty() {
            return None;
        }

        Some(InstrumentRecord::new(
            cell(self.exchange),
            trading_symbol,
            cell(self.series),
            security_id,
        ))
    }

    /// Lay a record out as a full-width row, empty cells elsewhere.
    pub fn row(&self, record: &InstrumentRecord) -> Vec<String> {
        let mut row = vec![String::new(); self.width];
        row[self.exchange] = record.exchange.clone();
        row[self.trading_symbol] = record.trading_symbol.clone();
        row[self.series] = record.series.clone();
        row[self.security_id] = record.security_id.clone();
        row
    }
}

/// Read a whole dataset from `reader`.
pub fn read_records<R: Read>(
    reader: R,
    source: &str,
) -> Result<(ColumnLayout, Vec<InstrumentRecord>)> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let layout = ColumnLayout::from_headers(csv_reader.headers()?, source)?;

    let mut records = Vec::new();
    for row in csv_reader.records() {
        if let Some(record) = layout.record(&row?) {
            records.push(record);
        }
    }

    Ok((layout, records))
}

/// Spreadsheet round-trips turn `1594` into `1594.0`; undo that.
pub fn normalize_security_id(raw: &str) -> String {
    let raw = raw.trim();
    if let Some((whole, fraction)) = raw.split_once('.') {
        if !whole.is_empty()
            && whole.chars().all(|c| c.is_ascii_digit())
            && fraction.chars().all(|c| c == '0')
        {
            return whole.to_string();
        }
    }
    raw.to_string()
}
