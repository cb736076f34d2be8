//! Error types and failure classification for the symbols crate.
//!
//! This module provides:
//! - [`SymbolError`]: The error enum for dataset, download and catalog operations
//! - [`FailureKind`]: Classification used in resolution diagnostics
//!
//! No `SymbolError` ever leaves [`ResolutionCache::resolve`](crate::ResolutionCache::resolve).
//! The orchestrator records it against the tier that failed and moves on.

mod kind;

pub use kind::FailureKind;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur below the resolution boundary.
#[derive(Error, Debug)]
pub enum SymbolError {
    /// Reading or writing the dataset file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dataset file is not valid CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The dataset header does not carry the columns the resolver needs.
    #[error("{path} is missing required columns: {}", missing.join(", "))]
    MissingColumns {
        /// The file (or source) that was inspected
        path: String,
        /// Every required column that was absent
        missing: Vec<String>,
    },

    /// Fetching the dataset from its remote URL failed.
    #[error("Download from {url} failed: {message}")]
    Download {
        /// The URL that was requested
        url: String,
        /// What went wrong
        message: String,
    },

    /// No download URL is configured.
    #[error("No dataset download URL configured")]
    NoDownloadUrl,

    /// The brokerage catalog endpoint returned an error.
    #[error("Catalog error: {message}")]
    Catalog {
        /// Status or body summary from the brokerage
        message: String,
    },

    /// The catalog round-trip exceeded its time budget.
    #[error("Catalog lookup timed out after {timeout_ms} ms")]
    CatalogTimeout {
        /// The configured bound
        timeout_ms: u64,
    },

    /// The catalog body could not be interpreted as rows or a table.
    #[error("Catalog format error: {0}")]
    CatalogFormat(String),

    /// A network error occurred while talking to a remote endpoint.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File work moved off the async runtime panicked or was cancelled.
    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SymbolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the failure classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use dhanbridge_symbols::errors::{FailureKind, SymbolError};
    ///
    /// let error = SymbolError::CatalogTimeout { timeout_ms: 500 };
    /// assert_eq!(error.kind(), FailureKind::Transient);
    ///
    /// let error = SymbolError::NoDownloadUrl;
    /// assert_eq!(error.kind(), FailureKind::Configuration);
    /// ```
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Download { .. }
            | Self::Catalog { .. }
            | Self::CatalogTimeout { .. }
            | Self::Network(_)
            | Self::Task(_) => FailureKind::Transient,

            Self::NoDownloadUrl => FailureKind::Configuration,

            Self::Io { .. } | Self::Csv(_) | Self::MissingColumns { .. } | Self::CatalogFormat(_) => {
                FailureKind::Data
            }
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SymbolError>;
