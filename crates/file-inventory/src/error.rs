//! Error types for the file-inventory crate.

use filename_template::TemplateError;
use inventory_common::TimeParseError;
use thiserror::Error;

/// Errors that can occur while listing, indexing or storing files.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filename template: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{0} not in available file list")]
    NotInFileList(String),

    #[error("Template '{template}' has no '{field}' field")]
    MissingField { field: String, template: String },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to serialize file list: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to parse settings: {0}")]
    Settings(#[from] serde_yaml::Error),

    #[error(transparent)]
    Time(#[from] TimeParseError),
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
