//! Local file inventory for time-indexed instrument data.
//!
//! # Pipeline
//!
//! ```text
//! data_path ──▶ scanner ──▶ filename-template ──▶ table builder ──▶ cadence ──▶ Inventory
//!               (glob)      (field extraction)    (dedup/sort)     (daily rows)
//! ```
//!
//! - [`scanner`] matches a search pattern below a data directory
//! - [`table`] turns parsed filename fields into a sorted, version-resolved
//!   [`FileTable`]
//! - [`cadence`] expands monthly/yearly files into per-day rows
//! - [`Inventory`] owns the table, refreshes it, and reports new files
//! - [`Settings`] locates data directories and the on-disk file-list store

pub mod cadence;
pub mod config;
pub mod error;
pub mod inventory;
pub mod listing;
pub mod scanner;
pub mod store;
pub mod table;

pub use cadence::{normalize, split_date_suffix, Cadence};
pub use config::{InstrumentId, Settings, SETTINGS_PATH_ENV};
pub use error::{InventoryError, Result};
pub use inventory::{FileMarker, Inventory};
pub use listing::{FileListing, LocalFileListing, ParseMode};
pub use scanner::{scan, ScanOptions};
pub use store::FileListStore;
pub use table::{FileEntry, FileTable, FileTableBuilder};
