//! Time-indexed file tables.

use std::collections::HashMap;
use std::ops::Range;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use filename_template::{expand_two_digit_year, ParsedFieldSet, VERSION_FIELDS};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{InventoryError, Result};

/// One file and the start time of the data it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub time: DateTime<Utc>,
    pub file: String,
}

impl FileEntry {
    pub fn new(time: DateTime<Utc>, file: impl Into<String>) -> Self {
        Self {
            time,
            file: file.into(),
        }
    }
}

/// Filenames ordered by timestamp, one file per timestamp.
#[derive(Debug, Clone, Default)]
pub struct FileTable {
    entries: Vec<FileEntry>,
    positions: HashMap<String, usize>,
}

impl PartialEq for FileTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for FileTable {}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from entries in any order. Entries are sorted by time;
    /// ties keep their input order.
    pub fn from_entries(mut entries: Vec<FileEntry>) -> Self {
        entries.sort_by(|a, b| a.time.cmp(&b.time));
        let mut positions = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            positions.entry(entry.file.clone()).or_insert(i);
        }
        Self { entries, positions }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    pub fn first(&self) -> Option<&FileEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&FileEntry> {
        self.entries.last()
    }

    pub fn file(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.file.as_str())
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.file.as_str())
    }

    pub fn times(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.entries.iter().map(|e| e.time)
    }

    /// Position of `file` in the table.
    pub fn position(&self, file: &str) -> Option<usize> {
        self.positions.get(file).copied()
    }

    pub fn contains_file(&self, file: &str) -> bool {
        self.positions.contains_key(file)
    }

    /// Entry stamped exactly at `time`.
    pub fn at(&self, time: DateTime<Utc>) -> Option<&FileEntry> {
        let idx = self.entries.partition_point(|e| e.time < time);
        self.entries.get(idx).filter(|e| e.time == time)
    }

    /// Indices of entries with `start <= time <= stop`.
    pub fn range_inclusive(&self, start: DateTime<Utc>, stop: DateTime<Utc>) -> Range<usize> {
        let lo = self.entries.partition_point(|e| e.time < start);
        let hi = self.entries.partition_point(|e| e.time <= stop);
        lo..hi.max(lo)
    }

    /// Indices of entries with `start <= time < end`.
    pub fn range_half_open(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Range<usize> {
        let lo = self.entries.partition_point(|e| e.time < start);
        let hi = self.entries.partition_point(|e| e.time < end);
        lo..hi.max(lo)
    }

    /// Entries of `self` whose filename does not appear in `other`.
    pub fn difference(&self, other: &FileTable) -> FileTable {
        let entries = self
            .entries
            .iter()
            .filter(|e| !other.contains_file(&e.file))
            .cloned()
            .collect();
        FileTable::from_entries(entries)
    }
}

impl<'a> IntoIterator for &'a FileTable {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Turns parsed filename fields into a [`FileTable`].
///
/// Files sharing a timestamp are resolved by `(version, revision, cycle)`,
/// highest wins. Without version fields the last filename in sort order
/// wins.
#[derive(Debug, Clone, Default)]
pub struct FileTableBuilder {
    two_digit_year_break: Option<i32>,
}

struct Candidate<'a> {
    time: DateTime<Utc>,
    rank: [i64; 3],
    file: &'a str,
}

impl FileTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat years as two digits, splitting centuries at `year_break`.
    pub fn two_digit_year_break(mut self, year_break: Option<i32>) -> Self {
        self.two_digit_year_break = year_break;
        self
    }

    pub fn build(&self, parsed: &ParsedFieldSet) -> Result<FileTable> {
        if parsed.get("year").is_none() {
            return Err(InventoryError::MissingField {
                field: "year".to_string(),
                template: parsed.template().to_string(),
            });
        }
        let versioned = VERSION_FIELDS.iter().any(|f| parsed.get(f).is_some());

        let mut candidates = Vec::with_capacity(parsed.len());
        for (i, file) in parsed.files().iter().enumerate() {
            match self.candidate(parsed, i, file) {
                Some(candidate) => candidates.push(candidate),
                None => warn!(file = %file, "Unable to build timestamp from filename, skipping"),
            }
        }

        candidates.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then(a.rank.cmp(&b.rank))
                .then(a.file.cmp(b.file))
        });

        let mut entries: Vec<FileEntry> = Vec::with_capacity(candidates.len());
        let mut replaced = 0usize;
        for candidate in candidates {
            match entries.last_mut() {
                Some(last) if last.time == candidate.time => {
                    last.file = candidate.file.to_string();
                    replaced += 1;
                }
                _ => entries.push(FileEntry::new(candidate.time, candidate.file)),
            }
        }

        if replaced > 0 {
            if versioned {
                debug!(replaced, "Dropped superseded file versions");
            } else {
                warn!(
                    replaced,
                    "Duplicate file times without version fields, keeping last filename"
                );
            }
        }

        Ok(FileTable::from_entries(entries))
    }

    fn candidate<'a>(&self, parsed: &ParsedFieldSet, i: usize, file: &'a str) -> Option<Candidate<'a>> {
        let field = |name: &str| -> Option<Option<i64>> {
            match parsed.get(name) {
                None => Some(None),
                Some(values) => values.get(i)?.trim().parse::<i64>().ok().map(Some),
            }
        };

        let year = i32::try_from(field("year")??).ok()?;
        let year = expand_two_digit_year(year, self.two_digit_year_break);
        let month = field("month")?;
        let day = field("day")?;
        let seconds = field("hour")?
            .unwrap_or(0)
            .checked_mul(3600)?
            .checked_add(field("minute")?.unwrap_or(0).checked_mul(60)?)?
            .checked_add(field("second")?.unwrap_or(0))?;

        let time = file_time(year, month, day, seconds)?;

        let mut rank = [0i64; 3];
        for (slot, name) in rank.iter_mut().zip(VERSION_FIELDS) {
            *slot = field(name)?.unwrap_or(0);
        }

        Some(Candidate { time, rank, file })
    }
}

/// Timestamp from filename fields. Without a month, `day` is a day of year.
fn file_time(year: i32, month: Option<i64>, day: Option<i64>, seconds: i64) -> Option<DateTime<Utc>> {
    let day = u32::try_from(day.unwrap_or(1)).ok()?;
    let date = match month {
        Some(month) => NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, day)?,
        None => NaiveDate::from_yo_opt(year, day)?,
    };
    let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::default()));
    midnight.checked_add_signed(Duration::try_seconds(seconds)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filename_template::{extract_delimited, extract_fixed_width, FormatTemplate};
    use inventory_common::utc_date;

    fn build(template: &str, files: &[&str]) -> Result<FileTable> {
        let t = FormatTemplate::parse(template).unwrap();
        let parsed = extract_fixed_width(files, &t).unwrap();
        FileTableBuilder::new().build(&parsed)
    }

    #[test]
    fn test_sorted_by_time() {
        let table = build(
            "{year:04d}-{month:02d}-{day:02d}.nofile",
            &["2009-01-03.nofile", "2009-01-01.nofile", "2009-01-02.nofile"],
        )
        .unwrap();
        let files: Vec<_> = table.files().collect();
        assert_eq!(files, vec!["2009-01-01.nofile", "2009-01-02.nofile", "2009-01-03.nofile"]);
        assert_eq!(table.first().unwrap().time, utc_date(2009, 1, 1).unwrap());
        assert_eq!(table.position("2009-01-03.nofile"), Some(2));
    }

    #[test]
    fn test_highest_version_wins() {
        let t = FormatTemplate::parse("f_{year:04d}{month:02d}{day:02d}_v{version}_r{revision}.cdf").unwrap();
        let files = [
            "f_20090101_v1_r3.cdf",
            "f_20090101_v2_r0.cdf",
            "f_20090101_v2_r1.cdf",
            "f_20090102_v1_r0.cdf",
        ];
        let parsed = extract_delimited(&files, &t, "_").unwrap();
        let table = FileTableBuilder::new().build(&parsed).unwrap();
        let files: Vec<_> = table.files().collect();
        assert_eq!(files, vec!["f_20090101_v2_r1.cdf", "f_20090102_v1_r0.cdf"]);
    }

    #[test]
    fn test_versions_compare_numerically() {
        let t = FormatTemplate::parse("f_{year:04d}{day:03d}_v{version}.cdf").unwrap();
        let parsed = extract_delimited(&["f_2009001_v9.cdf", "f_2009001_v10.cdf"], &t, "_").unwrap();
        let table = FileTableBuilder::new().build(&parsed).unwrap();
        assert_eq!(table.file(0), Some("f_2009001_v10.cdf"));
    }

    #[test]
    fn test_unversioned_duplicates_keep_last() {
        let table = build(
            "{year:04d}{month:02d}{day:02d}_{hour:02d}.txt",
            &["20090101_00.txt", "x20090101_00.txt"],
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.file(0), Some("x20090101_00.txt"));
    }

    #[test]
    fn test_day_of_year_without_month() {
        let table = build("{year:04d}{day:03d}.cdf", &["2008366.cdf", "2009032.cdf"]).unwrap();
        assert_eq!(table.get(0).unwrap().time, utc_date(2008, 12, 31).unwrap());
        assert_eq!(table.get(1).unwrap().time, utc_date(2009, 2, 1).unwrap());
    }

    #[test]
    fn test_time_of_day_fields() {
        let table = build(
            "{year:04d}{month:02d}{day:02d}T{hour:02d}{minute:02d}{second:02d}.dat",
            &["20090101T123015.dat"],
        )
        .unwrap();
        let expected = utc_date(2009, 1, 1).unwrap() + Duration::seconds(12 * 3600 + 30 * 60 + 15);
        assert_eq!(table.get(0).unwrap().time, expected);
    }

    #[test]
    fn test_two_digit_year() {
        let t = FormatTemplate::parse("{year:02d}{month:02d}{day:02d}.dat").unwrap();
        let parsed = extract_fixed_width(&["990101.dat", "040101.dat"], &t).unwrap();
        let table = FileTableBuilder::new()
            .two_digit_year_break(Some(50))
            .build(&parsed)
            .unwrap();
        assert_eq!(table.get(0).unwrap().time, utc_date(1999, 1, 1).unwrap());
        assert_eq!(table.get(1).unwrap().time, utc_date(2004, 1, 1).unwrap());
    }

    #[test]
    fn test_invalid_dates_are_skipped() {
        let table = build(
            "{year:04d}-{month:02d}-{day:02d}.nofile",
            &["2009-02-30.nofile", "2009-ab-01.nofile", "2009-03-01.nofile"],
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.file(0), Some("2009-03-01.nofile"));
    }

    #[test]
    fn test_oversized_time_fields_are_skipped() {
        let t = FormatTemplate::parse("f_{year:04d}{day:03d}_{hour}.cdf").unwrap();
        let files = ["f_2009001_3.cdf", "f_2009002_9223372036854775807.cdf", "f_2009003_99999999999999.cdf"];
        let parsed = extract_delimited(&files, &t, "_").unwrap();
        let table = FileTableBuilder::new().build(&parsed).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.file(0), Some("f_2009001_3.cdf"));
        assert_eq!(table.get(0).map(|e| e.time), Some(utc_date(2009, 1, 1).unwrap() + Duration::hours(3)));
    }

    #[test]
    fn test_template_without_year() {
        let t = FormatTemplate::parse("f_{month:02d}{day:02d}.dat").unwrap();
        let parsed = extract_fixed_width(&["f_0101.dat"], &t).unwrap();
        assert!(matches!(
            FileTableBuilder::new().build(&parsed),
            Err(InventoryError::MissingField { .. })
        ));
    }

    #[test]
    fn test_ranges_and_difference() {
        let day = |d| utc_date(2010, 1, d).unwrap();
        let table = FileTable::from_entries(
            (1..=5).map(|d| FileEntry::new(day(d), format!("f{}", d))).collect(),
        );
        assert_eq!(table.range_inclusive(day(2), day(4)), 1..4);
        assert_eq!(table.range_half_open(day(2), day(4)), 1..3);
        assert_eq!(table.range_inclusive(day(4), day(2)), 3..3);
        assert_eq!(table.at(day(3)).map(|e| e.file.as_str()), Some("f3"));
        assert!(table.at(day(3) + Duration::hours(1)).is_none());

        let older = FileTable::from_entries(table.entries()[..3].to_vec());
        let new: Vec<_> = table.difference(&older).files().map(str::to_string).collect();
        assert_eq!(new, vec!["f4", "f5"]);
    }
}
