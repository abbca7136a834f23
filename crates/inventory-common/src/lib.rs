//! Common types and utilities shared across the instrument file crates.

pub mod time;

pub use time::{
    create_date_range, date_range, floor_to_day, parse_date, utc_date, Freq, FreqUnit,
    TimeParseError, TimeRange,
};
