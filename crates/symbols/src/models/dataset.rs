use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::{InstrumentRecord, ResolutionKey};

/// Where the in-process dataset view came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetOrigin {
    /// An existing file on disk.
    Local,
    /// Fetched from the configured download URL.
    Downloaded,
    /// No source was available; a header-only shell was created.
    Empty,
    /// The file existed but could not be read or parsed.
    LoadError,
}

impl fmt::Display for DatasetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Downloaded => write!(f, "downloaded"),
            Self::Empty => write!(f, "empty"),
            Self::LoadError => write!(f, "load-error"),
        }
    }
}

/// Ordered instrument records plus load metadata.
///
/// Records keep file order; lookups return the first match so duplicate
/// rows resolve deterministically.
#[derive(Clone, Debug)]
pub struct Dataset {
    records: Vec<InstrumentRecord>,
    origin: DatasetOrigin,
    loaded_at: DateTime<Utc>,
    error: Option<String>,
}

impl Dataset {
    pub fn new(records: Vec<InstrumentRecord>, origin: DatasetOrigin) -> Self {
        Self {
            records,
            origin,
            loaded_at: Utc::now(),
            error: None,
        }
    }

    pub fn empty(origin: DatasetOrigin) -> Self {
        Self::new(Vec::new(), origin)
    }

    /// An empty view carrying the reason the file could not be loaded.
    pub fn load_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(DatasetOrigin::LoadError)
        }
    }

    pub fn records(&self) -> &[InstrumentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn origin(&self) -> DatasetOrigin {
        self.origin
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn load_error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// First record matching `key`, in file order.
    pub fn find(&self, key: &ResolutionKey) -> Option<&InstrumentRecord> {
        self.records.iter().find(|record| record.matches(key))
    }

    pub fn contains(&self, key: &ResolutionKey) -> bool {
        self.find(key).is_some()
    }

    pub(crate) fn push(&mut self, record: InstrumentRecord) {
        self.records.push(record);
    }

    /// True when there is no usable on-disk data at all: the file failed to
    /// load, or it is a fresh shell nothing has been written into yet.
    pub fn is_unavailable(&self) -> bool {
        match self.origin {
            DatasetOrigin::LoadError => true,
            DatasetOrigin::Empty => self.records.is_empty(),
            DatasetOrigin::Local | DatasetOrigin::Downloaded => false,
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            origin: self.origin,
            records: self.records.len(),
            loaded_at: self.loaded_at,
            error: self.error.clone(),
        }
    }
}

/// Serializable snapshot of dataset metadata for status reporting.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub origin: DatasetOrigin,
    pub records: usize,
    pub loaded_at: DateTime<Utc>,
    pub error: Option<String>,
}
