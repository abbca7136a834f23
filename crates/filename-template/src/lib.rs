//! Filename format templates for dated instrument files.
//!
//! A template such as `"cnofs_vefi_{year:04d}{month:02d}{day:02d}_v{version:02d}.cdf"`
//! describes how field values are laid out in a filename. This crate:
//!
//! - parses templates into literal fragments and typed fields
//! - builds glob search patterns (fixed-width `?` runs or `*` wildcards)
//! - extracts raw field values back out of matching filenames, either by
//!   byte offset (fixed width) or by splitting on a delimiter
//! - renders templates from field values

pub mod error;
pub mod parse;
pub mod search;
pub mod template;

pub use error::{Result, TemplateError};
pub use parse::{expand_two_digit_year, extract_delimited, extract_fixed_width, ParsedFieldSet};
pub use search::SearchPattern;
pub use template::{FieldSpec, FieldValue, FormatTemplate, Segment, DATE_FIELDS, VERSION_FIELDS};
