//! Persisted security dataset.
//!
//! - `columns` - Header names, column layout and CSV row parsing
//! - `dataset_store` - The file-backed store owning the dataset and its view

mod columns;
mod dataset_store;

pub use columns::{
    normalize_security_id, read_records, ColumnLayout, EXCHANGE_COLUMN, REQUIRED_COLUMNS,
    SECURITY_ID_COLUMN, SERIES_COLUMN, TRADING_SYMBOL_COLUMN,
};
pub use dataset_store::DatasetStore;
