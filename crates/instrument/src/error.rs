//! Error types for the instrument crate.

use std::fmt;

use file_inventory::InventoryError;
use thiserror::Error;

/// Why iteration cannot move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The inventory has no files.
    EmptyFileList,
    /// The loaded window is not part of the bounds sequence.
    NotInIteration(String),
    /// Already at the first or last window.
    OutsideBounds,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EmptyFileList => f.write_str("File list is empty. Nothing to be done."),
            StopReason::NotInIteration(loaded) => write!(
                f,
                "Unable to find loaded {} in the supported iteration list. \
                 Check the instrument bounds for supported iteration ranges.",
                loaded
            ),
            StopReason::OutsideBounds => f.write_str("Outside the set date/file boundaries."),
        }
    }
}

/// Errors that can occur while bounding, iterating or loading.
#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    /// End of iteration. Not a failure.
    #[error("{0}")]
    Stop(StopReason),

    #[error("Failed to load data: {0:#}")]
    Load(anyhow::Error),

    #[error("Failed to download data: {0:#}")]
    Download(anyhow::Error),
}

impl InstrumentError {
    pub fn is_stop(&self) -> bool {
        matches!(self, InstrumentError::Stop(_))
    }
}

/// Result type for instrument operations.
pub type Result<T> = std::result::Result<T, InstrumentError>;
