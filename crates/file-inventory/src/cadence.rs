//! Expansion of coarse-cadence files into daily rows.

use chrono::{Duration, NaiveDate};
use inventory_common::{floor_to_day, Freq};
use serde::{Deserialize, Serialize};

use crate::table::{FileEntry, FileTable};

/// Suffix appended to expanded filenames: `<file>_YYYY-MM-DD`.
pub const DATE_SUFFIX_FORMAT: &str = "%Y-%m-%d";

/// How much time one file covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Cadence(Freq);

impl Cadence {
    pub fn new(freq: Freq) -> Self {
        Self(freq)
    }

    pub fn daily() -> Self {
        Self(Freq::DAILY)
    }

    pub fn freq(&self) -> Freq {
        self.0
    }

    pub fn is_daily_or_finer(&self) -> bool {
        self.0.is_daily_or_finer()
    }
}

impl From<Freq> for Cadence {
    fn from(freq: Freq) -> Self {
        Self(freq)
    }
}

/// Give every day covered by a coarse-cadence file its own row.
///
/// File `i` covers the days from its own day up to (not including) the
/// day of file `i + 1`; the last file covers one cadence period. Each row
/// is named `<file>_YYYY-MM-DD`. Tables at daily cadence or finer are
/// returned unchanged.
pub fn normalize(table: &FileTable, cadence: &Cadence) -> FileTable {
    if cadence.is_daily_or_finer() || table.is_empty() {
        return table.clone();
    }

    let mut entries = Vec::new();
    for (i, entry) in table.iter().enumerate() {
        let first_day = floor_to_day(entry.time);
        let end_day = match table.get(i + 1) {
            Some(next) => floor_to_day(next.time),
            None => cadence
                .freq()
                .advance(first_day)
                .unwrap_or(first_day + Duration::days(1)),
        };

        let mut day = first_day;
        while day < end_day {
            entries.push(FileEntry::new(
                day,
                format!("{}_{}", entry.file, day.format(DATE_SUFFIX_FORMAT)),
            ));
            day += Duration::days(1);
        }
    }

    FileTable::from_entries(entries)
}

/// Split `<file>_YYYY-MM-DD` into the original filename and its day.
///
/// Names without a date suffix come back unchanged with `None`.
pub fn split_date_suffix(name: &str) -> (&str, Option<NaiveDate>) {
    if let Some((base, suffix)) = name.rsplit_once('_') {
        if let Ok(date) = NaiveDate::parse_from_str(suffix, DATE_SUFFIX_FORMAT) {
            return (base, Some(date));
        }
    }
    (name, None)
}
