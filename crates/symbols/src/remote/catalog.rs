//! Brokerage instrument catalog payloads.
//!
//! The catalog arrives either as a collection of row objects or as a
//! pre-tabulated structure (CSV text, or JSON `columns` + `data` arrays).
//! Both shapes are matched by the same rule.

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::{Result, SymbolError};
use crate::models::ResolutionKey;
use crate::store::{
    normalize_security_id, EXCHANGE_COLUMN, SECURITY_ID_COLUMN, SERIES_COLUMN,
    TRADING_SYMBOL_COLUMN,
};

/// One catalog entry in row-collection form.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct CatalogRow {
    #[serde(
        rename = "SEM_EXM_EXCH_ID",
        alias = "exchange",
        default,
        deserialize_with = "lenient_string"
    )]
    pub exchange: String,
    #[serde(
        rename = "SEM_TRADING_SYMBOL",
        alias = "tradingSymbol",
        default,
        deserialize_with = "lenient_string"
    )]
    pub trading_symbol: String,
    #[serde(
        rename = "SEM_SERIES",
        alias = "series",
        default,
        deserialize_with = "lenient_string"
    )]
    pub series: String,
    #[serde(
        rename = "SEM_SMST_SECURITY_ID",
        alias = "securityId",
        default,
        deserialize_with = "lenient_string"
    )]
    pub security_id: String,
}

/// Catalog in tabulated form: a header plus positional rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A full catalog as returned by the brokerage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogPayload {
    Rows(Vec<CatalogRow>),
    Table(CatalogTable),
}

impl CatalogPayload {
    /// Interpret a raw response body.
    ///
    /// A body starting with `[` or `{` is JSON; anything else is CSV.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let first = body.iter().find(|b| !b.is_ascii_whitespace());
        match first {
            None => Err(SymbolError::CatalogFormat("empty catalog body".to_string())),
            Some(b'[') | Some(b'{') => Self::parse_json(body),
            Some(_) => Self::parse_csv(body),
        }
    }

    fn parse_json(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| SymbolError::CatalogFormat(format!("invalid JSON: {}", e)))?;

        match value {
            Value::Array(_) => rows_from_value(value),
            Value::Object(mut object) => {
                let data = object.remove("data").ok_or_else(|| {
                    SymbolError::CatalogFormat("JSON catalog has no `data` field".to_string())
                })?;

                match object.remove("columns") {
                    Some(Value::Array(columns)) => {
                        let columns = columns.into_iter().map(value_to_string).collect();
                        let rows = match data {
                            Value::Array(rows) => rows
                                .into_iter()
                                .map(|row| match row {
                                    Value::Array(cells) => {
                                        Ok(cells.into_iter().map(value_to_string).collect())
                                    }
                                    _ => Err(SymbolError::CatalogFormat(
                                        "tabulated catalog row is not an array".to_string(),
                                    )),
                                })
                                .collect::<Result<Vec<Vec<String>>>>()?,
                            _ => {
                                return Err(SymbolError::CatalogFormat(
                                    "tabulated catalog `data` is not an array".to_string(),
                                ))
                            }
                        };
                        Ok(Self::Table(CatalogTable { columns, rows }))
                    }
                    _ => rows_from_value(data),
                }
            }
            _ => Err(SymbolError::CatalogFormat(
                "JSON catalog is neither an array nor an object".to_string(),
            )),
        }
    }

    fn parse_csv(body: &[u8]) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(body);

        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Self::Table(CatalogTable { columns, rows }))
    }

    /// Number of entries in the catalog.
    pub fn len(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Table(table) => table.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Security id of the first entry matching `key`.
    ///
    /// Matches trading symbol and series exactly; the exchange is compared
    /// only when the entry carries one.
    pub fn find_security_id(&self, key: &ResolutionKey) -> Result<Option<String>> {
        match self {
            Self::Rows(rows) => Ok(rows
                .iter()
                .find(|row| {
                    entry_matches(&row.exchange, &row.trading_symbol, &row.series, key)
                        && !row.security_id.trim().is_empty()
                })
                .map(|row| normalize_security_id(&row.security_id))),
            Self::Table(table) => table.find_security_id(key),
        }
    }
}

impl CatalogTable {
    fn find_security_id(&self, key: &ResolutionKey) -> Result<Option<String>> {
        let position = |name: &str| self.columns.iter().position(|c| c.trim() == name);

        let (symbol_idx, series_idx, id_idx) = match (
            position(TRADING_SYMBOL_COLUMN),
            position(SERIES_COLUMN),
            position(SECURITY_ID_COLUMN),
        ) {
            (Some(symbol), Some(series), Some(id)) => (symbol, series, id),
            (symbol, series, id) => {
                let missing = [
                    (TRADING_SYMBOL_COLUMN, symbol),
                    (SERIES_COLUMN, series),
                    (SECURITY_ID_COLUMN, id),
                ]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
                return Err(SymbolError::MissingColumns {
                    path: "brokerage catalog".to_string(),
                    missing,
                });
            }
        };
        let exchange_idx = position(EXCHANGE_COLUMN);

        fn cell(row: &[String], idx: usize) -> &str {
            row.get(idx).map(|s| s.trim()).unwrap_or("")
        }

        Ok(self
            .rows
            .iter()
            .find(|row| {
                let exchange = exchange_idx.map(|idx| cell(row, idx)).unwrap_or("");
                entry_matches(exchange, cell(row, symbol_idx), cell(row, series_idx), key)
                    && !cell(row, id_idx).is_empty()
            })
            .map(|row| normalize_security_id(cell(row, id_idx))))
    }
}

fn entry_matches(exchange: &str, trading_symbol: &str, series: &str, key: &ResolutionKey) -> bool {
    let exchange = exchange.trim();
    trading_symbol.trim() == key.trading_symbol
        && series.trim() == key.instrument_type
        && (exchange.is_empty() || exchange == key.exchange)
}

fn rows_from_value(value: Value) -> Result<CatalogPayload> {
    let rows: Vec<CatalogRow> = serde_json::from_value(value)
        .map_err(|e| SymbolError::CatalogFormat(format!("unexpected row shape: {}", e)))?;
    Ok(CatalogPayload::Rows(rows))
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}
