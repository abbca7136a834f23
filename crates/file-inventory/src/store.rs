//! On-disk record of the last known file list.
//!
//! [`Inventory::get_new`](crate::Inventory::get_new) compares against this
//! record so that new files are reported across process restarts.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{InstrumentId, Settings};
use crate::error::Result;
use crate::table::{FileEntry, FileTable};

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredFileList {
    version: u32,
    saved_at: DateTime<Utc>,
    files: Vec<FileEntry>,
}

/// JSON file holding a [`FileTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListStore {
    path: PathBuf,
}

impl FileListStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the archive location configured for `id`.
    pub fn for_instrument(settings: &Settings, id: &InstrumentId) -> Self {
        Self::new(settings.archive_path_for(id))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored table, or `None` if nothing has been saved yet.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Option<FileTable>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredFileList = serde_json::from_str(&content)?;
        debug!(count = stored.files.len(), saved_at = %stored.saved_at, "Loaded stored file list");
        Ok(Some(FileTable::from_entries(stored.files)))
    }

    /// Replace the stored table. The write goes through a temporary file
    /// and a rename.
    #[instrument(skip(self, table), fields(path = %self.path.display(), count = table.len()))]
    pub fn save(&self, table: &FileTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stored = StoredFileList {
            version: STORE_VERSION,
            saved_at: Utc::now(),
            files: table.entries().to_vec(),
        };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&stored)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Saved file list");
        Ok(())
    }
}
