//! Instrument data sources.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use file_inventory::{Cadence, FileListing, FileTable, LocalFileListing};
use inventory_common::TimeRange;

/// What a source is asked to load for one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub data_path: PathBuf,
    /// Files covering `padded`, relative to `data_path`.
    pub files: Vec<String>,
    /// The nominal window.
    pub window: TimeRange,
    /// The window widened by the instrument's pad. Equal to `window` when
    /// no pad is set.
    pub padded: TimeRange,
}

impl LoadRequest {
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|f| self.data_path.join(f))
    }

    pub fn is_padded(&self) -> bool {
        self.window != self.padded
    }
}

/// A provider of instrument files and the routine that reads them.
///
/// Only [`FileListing::list_files`] and [`InstrumentSource::load`] are
/// required.
pub trait InstrumentSource: FileListing {
    type Data;

    /// Time span of one file. Coarser-than-daily files are listed per day.
    fn cadence(&self) -> Cadence {
        Cadence::daily()
    }

    fn load(&self, request: &LoadRequest) -> Result<Self::Data>;

    /// Post-load cleanup applied to every window.
    fn clean(&self, _data: &mut Self::Data) -> Result<()> {
        Ok(())
    }

    /// Fetch the files for `dates` into `data_path`.
    fn download(&self, _dates: &[DateTime<Utc>], _data_path: &Path) -> Result<()> {
        bail!("Downloads are not supported by this source")
    }

    /// Files available from the remote archive.
    fn list_remote_files(&self) -> Result<FileTable> {
        Ok(FileTable::new())
    }
}

/// Source whose loaded data is the list of files for the window.
#[derive(Debug, Clone)]
pub struct FileEcho {
    listing: LocalFileListing,
}

impl FileEcho {
    pub fn new(listing: LocalFileListing) -> Self {
        Self { listing }
    }

    pub fn parse(template: &str) -> file_inventory::Result<Self> {
        Ok(Self::new(LocalFileListing::parse(template)?))
    }
}

impl FileListing for FileEcho {
    fn list_files(&self, data_path: &Path) -> file_inventory::Result<FileTable> {
        self.listing.list_files(data_path)
    }
}

impl InstrumentSource for FileEcho {
    type Data = Vec<String>;

    fn cadence(&self) -> Cadence {
        self.listing.file_cadence()
    }

    fn load(&self, request: &LoadRequest) -> Result<Self::Data> {
        Ok(request.files.clone())
    }
}
