//! The file inventory of one instrument data directory.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use inventory_common::floor_to_day;
use metrics::{counter, gauge};
use tracing::{debug, info, instrument};

use crate::error::{InventoryError, Result};
use crate::listing::FileListing;
use crate::store::FileListStore;
use crate::table::{FileEntry, FileTable};

/// A position in the inventory given either by date or by filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileMarker {
    Date(DateTime<Utc>),
    File(String),
}

impl FileMarker {
    fn kind(&self) -> &'static str {
        match self {
            FileMarker::Date(_) => "date",
            FileMarker::File(_) => "filename",
        }
    }
}

impl From<DateTime<Utc>> for FileMarker {
    fn from(date: DateTime<Utc>) -> Self {
        FileMarker::Date(date)
    }
}

impl From<&str> for FileMarker {
    fn from(file: &str) -> Self {
        FileMarker::File(file.to_string())
    }
}

impl From<String> for FileMarker {
    fn from(file: String) -> Self {
        FileMarker::File(file)
    }
}

impl fmt::Display for FileMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileMarker::Date(date) => write!(f, "{}", date.format("%Y-%m-%d %H:%M:%S")),
            FileMarker::File(file) => f.write_str(file),
        }
    }
}

/// Files available for one instrument, ordered by time.
///
/// The inventory keeps two tables: the current listing, updated by
/// [`Inventory::refresh`], and the last listing handed out by
/// [`Inventory::get_new`]. When a [`FileListStore`] is attached the latter
/// survives restarts.
pub struct Inventory {
    data_path: PathBuf,
    listing: Arc<dyn FileListing>,
    table: FileTable,
    known: FileTable,
    store: Option<FileListStore>,
}

impl Inventory {
    /// List `data_path` once and remember the result as already seen.
    pub fn new(data_path: impl Into<PathBuf>, listing: Arc<dyn FileListing>) -> Result<Self> {
        let mut inventory = Self {
            data_path: data_path.into(),
            listing,
            table: FileTable::new(),
            known: FileTable::new(),
            store: None,
        };
        inventory.refresh()?;
        inventory.known = inventory.table.clone();
        Ok(inventory)
    }

    /// Like [`Inventory::new`], but files seen in earlier runs are read from
    /// `store` so that [`Inventory::get_new`] reports everything added since
    /// the last save.
    pub fn with_store(
        data_path: impl Into<PathBuf>,
        listing: Arc<dyn FileListing>,
        store: FileListStore,
    ) -> Result<Self> {
        let mut inventory = Self::new(data_path, listing)?;
        if let Some(stored) = store.load()? {
            inventory.known = stored;
        } else {
            store.save(&inventory.known)?;
        }
        inventory.store = Some(store);
        Ok(inventory)
    }

    /// Start from the stored list without scanning. Falls back to
    /// [`Inventory::with_store`] when nothing has been stored yet.
    pub fn from_store(
        data_path: impl Into<PathBuf>,
        listing: Arc<dyn FileListing>,
        store: FileListStore,
    ) -> Result<Self> {
        let data_path = data_path.into();
        match store.load()? {
            Some(stored) => {
                debug!(count = stored.len(), "Using stored file list");
                Ok(Self {
                    data_path,
                    listing,
                    table: stored.clone(),
                    known: stored,
                    store: Some(store),
                })
            }
            None => Self::with_store(data_path, listing, store),
        }
    }

    /// Re-list the data directory. An empty directory yields an empty table.
    #[instrument(skip(self), fields(path = %self.data_path.display()))]
    pub fn refresh(&mut self) -> Result<()> {
        self.table = self.listing.list_files(&self.data_path)?;

        counter!("inventory_refresh_total").increment(1);
        gauge!("inventory_files").set(self.table.len() as f64);
        match (self.start_date(), self.stop_date()) {
            (Some(start), Some(stop)) => {
                info!(count = self.table.len(), start = %start, stop = %stop, "Refreshed file list")
            }
            _ => info!("No files found"),
        }
        Ok(())
    }

    /// Files that appeared since the previous call (or since construction).
    ///
    /// Refreshes first, then records the current listing as seen.
    #[instrument(skip(self), fields(path = %self.data_path.display()))]
    pub fn get_new(&mut self) -> Result<FileTable> {
        self.refresh()?;
        let new = self.table.difference(&self.known);
        self.known = self.table.clone();
        if let Some(store) = &self.store {
            store.save(&self.known)?;
        }

        counter!("inventory_new_files_total").increment(new.len() as u64);
        debug!(count = new.len(), "New files since last check");
        Ok(new)
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn table(&self) -> &FileTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Day of the first file.
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.table.first().map(|e| floor_to_day(e.time))
    }

    /// Day of the last file.
    pub fn stop_date(&self) -> Option<DateTime<Utc>> {
        self.table.last().map(|e| floor_to_day(e.time))
    }

    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.table.get(index)
    }

    pub fn file(&self, index: usize) -> Option<&str> {
        self.table.file(index)
    }

    /// Filename for index `index`, counting from the end when negative.
    pub fn file_at(&self, index: isize) -> Option<&str> {
        let idx = if index < 0 {
            self.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.file(idx)
    }

    /// Entries with positions in `range`, clamped to the table.
    pub fn files(&self, range: Range<usize>) -> &[FileEntry] {
        let entries = self.table.entries();
        let end = range.end.min(entries.len());
        &entries[range.start.min(end)..end]
    }

    /// The file stamped exactly at `date`.
    pub fn file_on(&self, date: DateTime<Utc>) -> Option<&str> {
        self.table.at(date).map(|e| e.file.as_str())
    }

    /// Files stamped between `start` and `stop`, both inclusive.
    pub fn files_between(&self, start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<&str> {
        let range = self.table.range_inclusive(start, stop);
        self.table.entries()[range].iter().map(|e| e.file.as_str()).collect()
    }

    /// Position of `file`.
    pub fn index_of(&self, file: &str) -> Result<usize> {
        self.table
            .position(file)
            .ok_or_else(|| InventoryError::NotInFileList(file.to_string()))
    }

    /// Files spanned by each `(start, stop)` pair, concatenated.
    ///
    /// Both bounds of every pair are inclusive. Pairs must be all dates or
    /// all filenames, and filename stops may not precede their starts.
    pub fn get_file_array(&self, starts: &[FileMarker], stops: &[FileMarker]) -> Result<Vec<String>> {
        if starts.len() != stops.len() {
            return Err(InventoryError::InvalidRange(
                "Both start and stop must have the same number of elements".to_string(),
            ));
        }

        let mut files = Vec::new();
        for (start, stop) in starts.iter().zip(stops) {
            match (start, stop) {
                (FileMarker::Date(start), FileMarker::Date(stop)) => {
                    files.extend(self.files_between(*start, *stop).into_iter().map(str::to_string));
                }
                (FileMarker::File(start), FileMarker::File(stop)) => {
                    let first = self.index_of(start)?;
                    let last = self.index_of(stop)?;
                    if last < first {
                        return Err(InventoryError::InvalidRange(format!(
                            "Filename bounds must be in increasing order: {} comes after {}",
                            start, stop
                        )));
                    }
                    files.extend(
                        self.table.entries()[first..=last]
                            .iter()
                            .map(|e| e.file.clone()),
                    );
                }
                (start, stop) => {
                    return Err(InventoryError::InvalidRange(format!(
                        "Start and stop items must all be of the same type, got {} and {}",
                        start.kind(),
                        stop.kind()
                    )))
                }
            }
        }
        Ok(files)
    }
}

impl PartialEq for Inventory {
    fn eq(&self, other: &Self) -> bool {
        self.data_path == other.data_path && self.table == other.table
    }
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inventory")
            .field("data_path", &self.data_path)
            .field("files", &self.table.len())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Local File Statistics")?;
        writeln!(f, "---------------------")?;
        writeln!(f, "Data Path: {}", self.data_path.display())?;
        writeln!(f, "Number of files: {}", self.table.len())?;
        match (self.start_date(), self.stop_date()) {
            (Some(start), Some(stop)) => write!(
                f,
                "Date Range: {} --- {}",
                start.format("%d %B %Y"),
                stop.format("%d %B %Y")
            ),
            _ => write!(f, "Date Range: None"),
        }
    }
}
