//! File-backed dataset store.
//!
//! The store owns both the CSV file on disk and the in-process [`Dataset`]
//! view built from it. Every persistence mutation goes through here; the
//! resolution layer never touches the file directly.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use csv::WriterBuilder;
use log::{debug, info, warn};

use crate::errors::{Result, SymbolError};
use crate::models::{Dataset, DatasetOrigin, DatasetSummary, InstrumentRecord, ResolutionKey};

use super::columns::{read_records, ColumnLayout, REQUIRED_COLUMNS};

/// Persisted symbol -> security id mapping plus its in-memory view.
///
/// Reads of the view take a short read lock to clone an `Arc`. Writers
/// (append, shell creation, download install) are serialized by an internal
/// mutex so the file is never written by two callers at once.
#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    view: RwLock<Arc<Dataset>>,
    write_lock: Mutex<()>,
}

impl DatasetStore {
    /// Create a store for `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            view: RwLock::new(Arc::new(Dataset::empty(DatasetOrigin::Empty))),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Time since the file was last written, or `None` if it does not exist.
    pub fn file_age(&self) -> Option<Duration> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// Load the file as a locally managed dataset.
    pub fn load(&self) -> Arc<Dataset> {
        self.load_as(DatasetOrigin::Local)
    }

    /// Load the file and install it as the current view.
    ///
    /// Never fails: an unreadable or malformed file produces an empty view
    /// with `origin = load-error` and the reason attached.
    pub fn load_as(&self, origin: DatasetOrigin) -> Arc<Dataset> {
        let dataset = match self.read_file() {
            Ok((_, records)) => {
                info!(
                    "Loaded {} records from {} ({})",
                    records.len(),
                    self.path.display(),
                    origin
                );
                Dataset::new(records, origin)
            }
            Err(e) => {
                warn!("Failed to load dataset {}: {}", self.path.display(), e);
                Dataset::load_error(e.to_string())
            }
        };
        self.install(dataset)
    }

    /// Write a header-only shell so later appends have a valid target.
    pub fn create_empty(&self) -> Result<Arc<Dataset>> {
        let _guard = self.lock_writes();
        self.write_shell()?;
        info!("Created empty dataset at {}", self.path.display());
        Ok(self.install(Dataset::empty(DatasetOrigin::Empty)))
    }

    /// Persist `record` unless a row with the same key already exists.
    ///
    /// Returns `true` if a row was written. The file is the source of truth
    /// for the duplicate check, so rows added outside this process are
    /// respected. Either way the in-process view ends up containing the key.
    pub fn append_if_absent(&self, record: &InstrumentRecord) -> Result<bool> {
        let _guard = self.lock_writes();
        let key = record.key();

        let layout = if self.has_content() {
            let (layout, existing) = self.read_file()?;
            if existing.iter().any(|r| r.matches(&key)) {
                debug!("{} already present in {}", key, self.path.display());
                self.ensure_in_view(&key, record);
                return Ok(false);
            }
            layout
        } else {
            self.write_shell()?;
            ColumnLayout::shell()
        };

        self.append_row(&layout, record)?;
        self.ensure_in_view(&key, record);
        info!(
            "Saved {} (ID: {}) to {}",
            key,
            record.security_id,
            self.path.display()
        );
        Ok(true)
    }

    /// Validate a downloaded body, swap it in atomically and install it as
    /// the current view.
    ///
    /// The body is parsed before anything touches disk; a body without the
    /// required columns is rejected and the existing file is left alone.
    pub fn install_download(&self, body: &[u8]) -> Result<Arc<Dataset>> {
        let source = self.path.display().to_string();
        let (_, records) = read_records(body, &source)?;

        let _guard = self.lock_writes();
        let partial = self.partial_path();
        self.ensure_parent_dir()?;
        fs::write(&partial, body).map_err(|e| SymbolError::io(&partial, e))?;
        fs::rename(&partial, &self.path).map_err(|e| SymbolError::io(&self.path, e))?;

        info!(
            "Installed downloaded dataset at {} ({} records)",
            self.path.display(),
            records.len()
        );
        Ok(self.install(Dataset::new(records, DatasetOrigin::Downloaded)))
    }

    /// The current in-process view.
    pub fn snapshot(&self) -> Arc<Dataset> {
        self.view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// First record in the current view matching `key`.
    pub fn find(&self, key: &ResolutionKey) -> Option<InstrumentRecord> {
        self.snapshot().find(key).cloned()
    }

    pub fn summary(&self) -> DatasetSummary {
        self.snapshot().summary()
    }

    fn read_file(&self) -> Result<(ColumnLayout, Vec<InstrumentRecord>)> {
        let file = File::open(&self.path).map_err(|e| SymbolError::io(&self.path, e))?;
        read_records(file, &self.path.display().to_string())
    }

    fn install(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        *self.view.write().unwrap_or_else(PoisonError::into_inner) = dataset.clone();
        dataset
    }

    fn ensure_in_view(&self, key: &ResolutionKey, record: &InstrumentRecord) {
        let mut view = self.view.write().unwrap_or_else(PoisonError::into_inner);
        if !view.contains(key) {
            Arc::make_mut(&mut *view).push(record.clone());
        }
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn has_content(&self) -> bool {
        fs::metadata(&self.path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    fn write_shell(&self) -> Result<()> {
        self.ensure_parent_dir()?;
        let file = File::create(&self.path).map_err(|e| SymbolError::io(&self.path, e))?;
        let mut writer = WriterBuilder::new().from_writer(file);
        writer.write_record(REQUIRED_COLUMNS)?;
        writer
            .flush()
            .map_err(|e| SymbolError::io(&self.path, e))
    }

    fn append_row(&self, layout: &ColumnLayout, record: &InstrumentRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SymbolError::io(&self.path, e))?;

        if !ends_with_newline(&mut file).map_err(|e| SymbolError::io(&self.path, e))? {
            file.write_all(b"\n")
                .map_err(|e| SymbolError::io(&self.path, e))?;
        }

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(layout.row(record))?;
        writer
            .flush()
            .map_err(|e| SymbolError::io(&self.path, e))
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| SymbolError::io(parent, e))
            }
            _ => Ok(()),
        }
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".part");
        self.path.with_file_name(name)
    }
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
