//! Error types for the filename-template crate.

use thiserror::Error;

/// Errors raised while parsing, searching with, or rendering a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unbalanced brace at position {position} in template '{template}'")]
    UnbalancedBrace { template: String, position: usize },

    #[error("Empty field name at position {position} in template '{template}'")]
    EmptyFieldName { template: String, position: usize },

    #[error("Template '{0}' contains no fields")]
    NoFields(String),

    #[error(
        "Couldn't determine formatting width for field '{field}'. \
         This may be due to the use of unsupported wildcard characters."
    )]
    UnknownWidth { field: String },

    #[error("Fields {fields:?} share one delimited segment and have no fixed widths")]
    AmbiguousSegment { fields: Vec<String> },

    #[error("Delimiter must not be empty")]
    EmptyDelimiter,

    #[error("Missing value for field '{0}'")]
    MissingValue(String),

    #[error("Value '{value}' does not fit format spec '{spec}' of field '{field}'")]
    InvalidValue {
        field: String,
        value: String,
        spec: String,
    },
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
