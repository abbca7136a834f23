//! Iteration bounds: what the user asks for and what it resolves to.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use file_inventory::{FileMarker, Inventory};
use inventory_common::{create_date_range, floor_to_day, Freq, TimeRange};
use tracing::debug;

use crate::error::{InstrumentError, Result};

/// Step or width of an iteration: a time frequency or a number of files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stride {
    Freq(Freq),
    Files(usize),
}

impl From<Freq> for Stride {
    fn from(freq: Freq) -> Self {
        Stride::Freq(freq)
    }
}

impl From<usize> for Stride {
    fn from(count: usize) -> Self {
        Stride::Files(count)
    }
}

impl fmt::Display for Stride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stride::Freq(freq) => write!(f, "{}", freq),
            Stride::Files(n) => write!(f, "{} files", n),
        }
    }
}

/// User-set bounds. Empty `starts`/`stops` fall back to the first/last
/// available date or file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoundsRequest {
    pub starts: Vec<FileMarker>,
    pub stops: Vec<FileMarker>,
    pub step: Option<Stride>,
    pub width: Option<Stride>,
}

impl BoundsRequest {
    /// Everything in the inventory.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn new(start: impl Into<FileMarker>, stop: impl Into<FileMarker>) -> Self {
        Self {
            starts: vec![start.into()],
            stops: vec![stop.into()],
            ..Default::default()
        }
    }

    /// Several disjoint start/stop ranges.
    pub fn season<I, J, T>(starts: I, stops: J) -> Self
    where
        I: IntoIterator<Item = T>,
        J: IntoIterator<Item = T>,
        T: Into<FileMarker>,
    {
        Self {
            starts: starts.into_iter().map(Into::into).collect(),
            stops: stops.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_step(mut self, step: impl Into<Stride>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn with_width(mut self, width: impl Into<Stride>) -> Self {
        self.width = Some(width.into());
        self
    }

    /// Check the request and realize its window sequence.
    ///
    /// `native` is the default date step when none was given.
    pub fn resolve(&self, inventory: &Inventory, native: Freq) -> Result<Bounds> {
        if self.starts.len() != self.stops.len() && !self.starts.is_empty() && !self.stops.is_empty() {
            return Err(InstrumentError::InvalidBounds(
                "Both start and stop must have the same number of elements".to_string(),
            ));
        }

        let kind = marker_kind(self.starts.iter().chain(&self.stops))?;
        match kind {
            None if inventory.is_empty() => Ok(Bounds::empty(native)),
            None => {
                let (start, stop) = inventory_dates(inventory)?;
                self.resolve_dates(BoundsKind::Unbounded, vec![start], vec![stop], native)
            }
            Some(MarkerKind::Date) => {
                let starts = fill_dates(&self.starts, inventory.start_date(), self.stops.len())?;
                let stops = fill_dates(&self.stops, inventory.stop_date(), self.starts.len())?;
                self.resolve_dates(BoundsKind::DateBounded, starts, stops, native)
            }
            Some(MarkerKind::File) => self.resolve_files(inventory),
        }
    }

    fn resolve_dates(
        &self,
        kind: BoundsKind,
        starts: Vec<DateTime<Utc>>,
        stops: Vec<DateTime<Utc>>,
        native: Freq,
    ) -> Result<Bounds> {
        let step = match self.step {
            None => native,
            Some(Stride::Freq(freq)) => freq,
            Some(Stride::Files(_)) => {
                return Err(InstrumentError::InvalidBounds(
                    "Date bounds need a time step, not a file count".to_string(),
                ))
            }
        };
        let width = match self.width {
            None => step,
            Some(Stride::Freq(freq)) => freq,
            Some(Stride::Files(_)) => {
                return Err(InstrumentError::InvalidBounds(
                    "Date bounds need a time width, not a file count".to_string(),
                ))
            }
        };

        let starts: Vec<_> = starts.into_iter().map(floor_to_day).collect();
        let stops: Vec<_> = stops.into_iter().map(floor_to_day).collect();
        check_increasing(starts.iter().zip(&stops))?;

        // Last allowed window start: its window must end by the day after stop.
        let unstops = stops
            .iter()
            .map(|stop| {
                width
                    .retreat(*stop)
                    .and_then(|d| d.checked_add_signed(Duration::days(1)))
                    .ok_or_else(|| InstrumentError::InvalidBounds(format!("Width {} is out of range", width)))
            })
            .collect::<Result<Vec<_>>>()?;

        let windows = create_date_range(&starts, &unstops, step)
            .into_iter()
            .filter_map(|start| width.advance(start).map(|end| Window::Date(TimeRange::new(start, end))))
            .collect::<Vec<_>>();
        debug!(windows = windows.len(), step = %step, width = %width, "Resolved date bounds");

        Ok(Bounds {
            kind,
            starts: starts.into_iter().map(FileMarker::Date).collect(),
            stops: stops.into_iter().map(FileMarker::Date).collect(),
            step: Stride::Freq(step),
            width: Stride::Freq(width),
            windows,
        })
    }

    fn resolve_files(&self, inventory: &Inventory) -> Result<Bounds> {
        let step = match self.step {
            None => 1,
            Some(Stride::Files(n)) => n,
            Some(Stride::Freq(_)) => {
                return Err(InstrumentError::InvalidBounds(
                    "Filename bounds need a file-count step, not a frequency".to_string(),
                ))
            }
        };
        let width = match self.width {
            None => step,
            Some(Stride::Files(n)) => n,
            Some(Stride::Freq(_)) => {
                return Err(InstrumentError::InvalidBounds(
                    "Filename bounds need a file-count width, not a frequency".to_string(),
                ))
            }
        };
        if step == 0 || width == 0 {
            return Err(InstrumentError::InvalidBounds(
                "Step and width must be positive".to_string(),
            ));
        }

        let starts = fill_markers(&self.starts, inventory.file(0), self.stops.len())?;
        let stops = fill_markers(&self.stops, inventory.file_at(-1), self.starts.len())?;

        let index = |marker: &FileMarker| -> Result<usize> {
            match marker {
                FileMarker::File(name) => inventory
                    .index_of(name)
                    .map_err(|e| InstrumentError::InvalidBounds(e.to_string())),
                FileMarker::Date(_) => Err(InstrumentError::InvalidBounds(
                    "Start and stop items must all be of the same type".to_string(),
                )),
            }
        };
        let ranges = starts
            .iter()
            .zip(&stops)
            .map(|(a, b)| Ok((index(a)?, index(b)?)))
            .collect::<Result<Vec<_>>>()?;
        check_increasing(ranges.iter().map(|(a, b)| (a, b)))?;

        let mut windows = Vec::new();
        for (first, last) in ranges {
            for i in (first..=last).step_by(step) {
                let end = i + width - 1;
                if end > last {
                    break;
                }
                if let (Some(a), Some(b)) = (inventory.get(i), inventory.get(end)) {
                    windows.push(Window::Files {
                        first: a.file.clone(),
                        last: b.file.clone(),
                        start: a.time,
                        stop: b.time,
                    });
                }
            }
        }
        debug!(windows = windows.len(), step, width, "Resolved filename bounds");

        Ok(Bounds {
            kind: BoundsKind::FileBounded,
            starts,
            stops,
            step: Stride::Files(step),
            width: Stride::Files(width),
            windows,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Date,
    File,
}

fn marker_kind<'a>(markers: impl Iterator<Item = &'a FileMarker>) -> Result<Option<MarkerKind>> {
    let mut kind = None;
    for marker in markers {
        let this = match marker {
            FileMarker::Date(_) => MarkerKind::Date,
            FileMarker::File(_) => MarkerKind::File,
        };
        match kind {
            Some(k) if k != this => {
                return Err(InstrumentError::InvalidBounds(
                    "Start and stop items must all be of the same type".to_string(),
                ))
            }
            _ => kind = Some(this),
        }
    }
    Ok(kind)
}

fn inventory_dates(inventory: &Inventory) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    match (inventory.start_date(), inventory.stop_date()) {
        (Some(start), Some(stop)) => Ok((start, stop)),
        _ => Err(open_ended_error()),
    }
}

fn open_ended_error() -> InstrumentError {
    InstrumentError::InvalidBounds("Open-ended bounds need at least one file".to_string())
}

/// The given dates, or `count` copies of `fallback` when none were given.
fn fill_dates(
    markers: &[FileMarker],
    fallback: Option<DateTime<Utc>>,
    count: usize,
) -> Result<Vec<DateTime<Utc>>> {
    if markers.is_empty() {
        let fallback = fallback.ok_or_else(open_ended_error)?;
        return Ok(vec![fallback; count.max(1)]);
    }
    Ok(markers
        .iter()
        .filter_map(|m| match m {
            FileMarker::Date(d) => Some(*d),
            FileMarker::File(_) => None,
        })
        .collect())
}

fn fill_markers(markers: &[FileMarker], fallback: Option<&str>, count: usize) -> Result<Vec<FileMarker>> {
    if markers.is_empty() {
        let fallback = fallback.ok_or_else(open_ended_error)?;
        return Ok(vec![FileMarker::from(fallback); count.max(1)]);
    }
    Ok(markers.to_vec())
}

fn check_increasing<'a, T: PartialOrd + fmt::Debug + 'a>(
    pairs: impl Iterator<Item = (&'a T, &'a T)>,
) -> Result<()> {
    for (start, stop) in pairs {
        if start > stop {
            return Err(InstrumentError::InvalidBounds(format!(
                "Bounds must be set in increasing order: start {:?} is after stop {:?}",
                start, stop
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsKind {
    /// The whole inventory, stepped by date.
    Unbounded,
    DateBounded,
    FileBounded,
}

/// One load unit of an iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Window {
    /// Data in `[start, end)`.
    Date(TimeRange),
    /// Files `first` through `last` inclusive, stamped `start` and `stop`.
    Files {
        first: String,
        last: String,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },
}

impl Window {
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            Window::Date(range) => range.start,
            Window::Files { start, .. } => *start,
        }
    }

    /// Time covered by the window. A file window runs to the end of the
    /// last file's day.
    pub fn time_range(&self) -> TimeRange {
        match self {
            Window::Date(range) => *range,
            Window::Files { start, stop, .. } => {
                TimeRange::new(*start, floor_to_day(*stop) + Duration::days(1))
            }
        }
    }

    fn matches(&self, other: &Window) -> bool {
        match (self, other) {
            (Window::Files { first: a, .. }, Window::Files { first: b, .. }) => a == b,
            _ => self.start() == other.start(),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Date(range) => write!(f, "date {}", range),
            Window::Files { first, last, .. } if first == last => write!(f, "filename {}", first),
            Window::Files { first, last, .. } => write!(f, "filenames {} to {}", first, last),
        }
    }
}

/// Resolved bounds and their window sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounds {
    kind: BoundsKind,
    starts: Vec<FileMarker>,
    stops: Vec<FileMarker>,
    step: Stride,
    width: Stride,
    windows: Vec<Window>,
}

impl Bounds {
    fn empty(native: Freq) -> Self {
        Self {
            kind: BoundsKind::Unbounded,
            starts: Vec::new(),
            stops: Vec::new(),
            step: Stride::Freq(native),
            width: Stride::Freq(native),
            windows: Vec::new(),
        }
    }

    pub fn kind(&self) -> BoundsKind {
        self.kind
    }

    pub fn starts(&self) -> &[FileMarker] {
        &self.starts
    }

    pub fn stops(&self) -> &[FileMarker] {
        &self.stops
    }

    pub fn step(&self) -> Stride {
        self.step
    }

    pub fn width(&self) -> Stride {
        self.width
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Start time of every window.
    pub fn dates(&self) -> Vec<DateTime<Utc>> {
        self.windows.iter().map(Window::start).collect()
    }

    /// First position of `window` in the sequence. File windows match on
    /// their first file, anything else on its start time.
    pub fn position(&self, window: &Window) -> Option<usize> {
        self.windows.iter().position(|w| w.matches(window))
    }

    /// Last position of `window`. Overlapping seasons can realize the same
    /// window more than once.
    pub fn last_position(&self, window: &Window) -> Option<usize> {
        self.windows.iter().rposition(|w| w.matches(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use file_inventory::{FileEntry, FileListing, FileTable};
    use inventory_common::{date_range, utc_date};
    use std::path::Path;
    use std::sync::Arc;

    struct Days(u32);

    impl FileListing for Days {
        fn list_files(&self, _data_path: &Path) -> file_inventory::Result<FileTable> {
            Ok(FileTable::from_entries(
                (1..=self.0)
                    .map(|d| FileEntry::new(day(d), format!("2008-01-{:02}.nofile", d)))
                    .collect(),
            ))
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        utc_date(2008, 1, d).unwrap()
    }

    fn inventory(days: u32) -> Inventory {
        Inventory::new("/data", Arc::new(Days(days))).unwrap()
    }

    fn err_text(result: Result<Bounds>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn test_unbounded_matches_daily_range() {
        let inv = inventory(10);
        let bounds = BoundsRequest::full().resolve(&inv, Freq::DAILY).unwrap();
        assert_eq!(bounds.kind(), BoundsKind::Unbounded);
        assert_eq!(bounds.dates(), date_range(day(1), day(10), Freq::DAILY));
    }

    #[test]
    fn test_empty_inventory_unbounded() {
        let inv = inventory(0);
        let bounds = BoundsRequest::full().resolve(&inv, Freq::DAILY).unwrap();
        assert!(bounds.is_empty());
    }

    #[test]
    fn test_explicit_dates_on_empty_inventory() {
        let inv = inventory(0);
        let bounds = BoundsRequest::new(day(1), day(3)).resolve(&inv, Freq::DAILY).unwrap();
        assert_eq!(bounds.len(), 3);

        let open = BoundsRequest {
            starts: vec![day(1).into()],
            ..Default::default()
        };
        assert!(err_text(open.resolve(&inv, Freq::DAILY)).contains("at least one file"));
    }

    #[test]
    fn test_date_bounds_with_width() {
        let inv = inventory(10);
        let bounds = BoundsRequest::new(day(2), day(6))
            .with_step(Freq::days(2).unwrap())
            .with_width(Freq::days(3).unwrap())
            .resolve(&inv, Freq::DAILY)
            .unwrap();
        assert_eq!(bounds.kind(), BoundsKind::DateBounded);
        // Windows start on days 2 and 4; a start on day 6 would run past the stop.
        assert_eq!(bounds.dates(), vec![day(2), day(4)]);
        assert_eq!(
            bounds.windows()[1],
            Window::Date(TimeRange::new(day(4), day(7)))
        );
    }

    #[test]
    fn test_date_bounds_are_floored() {
        let inv = inventory(10);
        let bounds = BoundsRequest::new(day(2) + Duration::hours(5), day(3) + Duration::hours(1))
            .resolve(&inv, Freq::DAILY)
            .unwrap();
        assert_eq!(bounds.dates(), vec![day(2), day(3)]);
    }

    #[test]
    fn test_season() {
        let inv = inventory(10);
        let bounds = BoundsRequest::season([day(1), day(8)], [day(2), day(9)])
            .resolve(&inv, Freq::DAILY)
            .unwrap();
        assert_eq!(bounds.dates(), vec![day(1), day(2), day(8), day(9)]);
    }

    #[test]
    fn test_file_bounds() {
        let inv = inventory(10);
        let bounds = BoundsRequest::new("2008-01-02.nofile", "2008-01-09.nofile")
            .resolve(&inv, Freq::DAILY)
            .unwrap();
        assert_eq!(bounds.kind(), BoundsKind::FileBounded);
        assert_eq!(bounds.len(), 8);
        assert_eq!(bounds.dates().first(), Some(&day(2)));
        assert_eq!(bounds.dates().last(), Some(&day(9)));
    }

    #[test]
    fn test_file_bounds_step_and_width() {
        let inv = inventory(10);
        let bounds = BoundsRequest::new("2008-01-01.nofile", "2008-01-07.nofile")
            .with_step(2usize)
            .with_width(3usize)
            .resolve(&inv, Freq::DAILY)
            .unwrap();
        let firsts: Vec<_> = bounds
            .windows()
            .iter()
            .map(|w| match w {
                Window::Files { first, last, .. } => (first.as_str(), last.as_str()),
                Window::Date(_) => unreachable!(),
            })
            .collect();
        assert_eq!(
            firsts,
            vec![
                ("2008-01-01.nofile", "2008-01-03.nofile"),
                ("2008-01-03.nofile", "2008-01-05.nofile"),
                ("2008-01-05.nofile", "2008-01-07.nofile"),
            ]
        );
    }

    #[test]
    fn test_open_ended_file_bounds() {
        let inv = inventory(5);
        let request = BoundsRequest {
            starts: vec!["2008-01-03.nofile".into()],
            ..Default::default()
        };
        let bounds = request.resolve(&inv, Freq::DAILY).unwrap();
        assert_eq!(bounds.len(), 3);
        assert_eq!(bounds.stops(), [FileMarker::from("2008-01-05.nofile")]);
    }

    #[test]
    fn test_rejects_decreasing_bounds() {
        let inv = inventory(10);
        let by_date = BoundsRequest::new(day(5), day(2)).resolve(&inv, Freq::DAILY);
        assert!(err_text(by_date).contains("increasing"));
        let by_file = BoundsRequest::new("2008-01-05.nofile", "2008-01-02.nofile").resolve(&inv, Freq::DAILY);
        assert!(err_text(by_file).contains("increasing"));
    }

    #[test]
    fn test_rejects_mixed_types() {
        let inv = inventory(10);
        let request = BoundsRequest {
            starts: vec![day(1).into()],
            stops: vec!["2008-01-05.nofile".into()],
            ..Default::default()
        };
        assert!(err_text(request.resolve(&inv, Freq::DAILY)).contains("same type"));
    }

    #[test]
    fn test_rejects_uneven_season() {
        let inv = inventory(10);
        let request = BoundsRequest::season([day(1), day(5)], [day(2)]);
        assert!(err_text(request.resolve(&inv, Freq::DAILY)).contains("same number of elements"));
    }

    #[test]
    fn test_rejects_mismatched_stride() {
        let inv = inventory(10);
        let dates = BoundsRequest::new(day(1), day(3)).with_step(2usize);
        assert!(dates.resolve(&inv, Freq::DAILY).is_err());
        let files = BoundsRequest::new("2008-01-01.nofile", "2008-01-03.nofile").with_step(Freq::DAILY);
        assert!(files.resolve(&inv, Freq::DAILY).is_err());
        let zero = BoundsRequest::new("2008-01-01.nofile", "2008-01-03.nofile").with_step(0usize);
        assert!(err_text(zero.resolve(&inv, Freq::DAILY)).contains("positive"));
    }

    #[test]
    fn test_rejects_unknown_file() {
        let inv = inventory(3);
        let request = BoundsRequest::new("2008-01-01.nofile", "2009-01-01.nofile");
        assert!(err_text(request.resolve(&inv, Freq::DAILY)).contains("not in available file list"));
    }
}
