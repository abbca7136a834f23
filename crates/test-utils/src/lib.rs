//! Shared test utilities for the instrument file inventory workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Throwaway data directories populated with instrument-style filenames
//! - Filename generators for daily, day-of-year and monthly archives
//! - Common filename templates
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{utc, TestArchive, templates};
//! ```

pub mod archive;
pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use archive::*;
pub use fixtures::*;
pub use generators::*;

#[doc(hidden)]
pub use chrono;

/// Midnight (or a given hour) UTC as a `DateTime<Utc>`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::utc;
///
/// let start = utc!(2009, 1, 1);
/// let noon = utc!(2009, 1, 1, 12);
/// ```
#[macro_export]
macro_rules! utc {
    ($y:expr, $m:expr, $d:expr) => {
        $crate::utc!($y, $m, $d, 0)
    };
    ($y:expr, $m:expr, $d:expr, $h:expr) => {{
        use $crate::chrono::TimeZone;
        $crate::chrono::Utc
            .with_ymd_and_hms($y, $m, $d, $h, 0, 0)
            .single()
            .expect("valid test date")
    }};
}

/// Assert that an iterator of filenames equals a list of expected names.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_files_eq;
///
/// assert_files_eq!(table.files(), ["2009-01-01.nofile", "2009-01-02.nofile"]);
/// ```
#[macro_export]
macro_rules! assert_files_eq {
    ($actual:expr, $expected:expr $(,)?) => {{
        let actual: Vec<String> = $actual.into_iter().map(|f| f.to_string()).collect();
        let expected: Vec<String> = $expected.iter().map(|f| f.to_string()).collect();
        assert_eq!(actual, expected, "file lists differ");
    }};
}
