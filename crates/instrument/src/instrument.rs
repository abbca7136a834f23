//! The instrument: a source, its inventory, bounds and the loaded window.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use file_inventory::{FileListStore, FileListing, FileTable, InstrumentId, Inventory, Settings};
use inventory_common::{date_range, floor_to_day, Freq, TimeRange};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::bounds::{Bounds, BoundsRequest, Window};
use crate::error::{InstrumentError, Result, StopReason};
use crate::source::{InstrumentSource, LoadRequest};

/// A loaded window and its data.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<D> {
    pub window: Window,
    pub files: Vec<String>,
    pub data: D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

pub struct Instrument<S: InstrumentSource> {
    id: InstrumentId,
    source: Arc<S>,
    inventory: Inventory,
    request: BoundsRequest,
    bounds: Bounds,
    pad: Option<Duration>,
    current: Option<Window>,
    /// Position of `current` in the bounds, when it was reached by stepping.
    cursor: Option<usize>,
    data: Option<S::Data>,
}

impl<S: InstrumentSource + 'static> Instrument<S> {
    /// Set up an instrument under the data directory `settings` gives for
    /// `id`, creating the directory if needed.
    ///
    /// The file list is persisted in the settings archive. With
    /// `update_files` off, the stored list is used without scanning.
    pub fn new(id: InstrumentId, source: S, settings: &Settings) -> Result<Self> {
        let data_path = settings.ensure_data_path(&id)?;
        let store = FileListStore::for_instrument(settings, &id);
        let source = Arc::new(source);
        let listing: Arc<dyn FileListing> = source.clone();

        let inventory = if settings.update_files {
            Inventory::with_store(data_path, listing, store)?
        } else {
            Inventory::from_store(data_path, listing, store)?
        };
        Self::build(id, source, inventory)
    }

    /// Set up an instrument over `data_path` without settings or a stored
    /// file list.
    pub fn with_data_path(id: InstrumentId, source: S, data_path: impl Into<PathBuf>) -> Result<Self> {
        let source = Arc::new(source);
        let inventory = Inventory::new(data_path, source.clone())?;
        Self::build(id, source, inventory)
    }

    fn build(id: InstrumentId, source: Arc<S>, inventory: Inventory) -> Result<Self> {
        let request = BoundsRequest::full();
        let bounds = request.resolve(&inventory, native_step(source.as_ref()))?;
        info!(instrument = %id, files = inventory.len(), "Instrument ready");
        Ok(Self {
            id,
            source,
            inventory,
            request,
            bounds,
            pad: None,
            current: None,
            cursor: None,
            data: None,
        })
    }

    /// Load extra data on both sides of every window.
    pub fn with_pad(mut self, pad: Duration) -> Self {
        self.pad = (pad > Duration::zero()).then_some(pad);
        self
    }

    pub fn id(&self) -> &InstrumentId {
        &self.id
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// The window last loaded, if any.
    pub fn current(&self) -> Option<&Window> {
        self.current.as_ref()
    }

    pub fn data(&self) -> Option<&S::Data> {
        self.data.as_ref()
    }

    pub fn take_data(&mut self) -> Option<S::Data> {
        self.data.take()
    }

    /// Replace the bounds. On error the previous bounds stay in place.
    pub fn set_bounds(&mut self, request: BoundsRequest) -> Result<()> {
        let bounds = request.resolve(&self.inventory, native_step(self.source.as_ref()))?;
        debug!(kind = ?bounds.kind(), windows = bounds.len(), "Bounds set");
        self.request = request;
        self.bounds = bounds;
        self.cursor = None;
        Ok(())
    }

    /// Re-list files and re-resolve the bounds against the new list.
    pub fn refresh(&mut self) -> Result<()> {
        self.inventory.refresh()?;
        self.reresolve()
    }

    /// Files added since the last check. Bounds are re-resolved.
    pub fn get_new(&mut self) -> Result<FileTable> {
        let new = self.inventory.get_new()?;
        self.reresolve()?;
        Ok(new)
    }

    fn reresolve(&mut self) -> Result<()> {
        self.bounds = self
            .request
            .resolve(&self.inventory, native_step(self.source.as_ref()))?;
        self.cursor = None;
        Ok(())
    }

    /// Load the window after the current one, or the first window when
    /// nothing is loaded.
    pub fn next(&mut self) -> Result<&S::Data> {
        let loaded = self.step(Direction::Forward)?;
        Ok(self.keep(loaded))
    }

    /// Load the window before the current one, or the last window when
    /// nothing is loaded.
    pub fn prev(&mut self) -> Result<&S::Data> {
        let loaded = self.step(Direction::Backward)?;
        Ok(self.keep(loaded))
    }

    /// Load one day starting at `date`, or through the day before `end`.
    pub fn load_date(&mut self, date: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<&S::Data> {
        let start = floor_to_day(date);
        let end = end.unwrap_or(start + Duration::days(1));
        if end <= start {
            return Err(InstrumentError::InvalidBounds(format!(
                "Load range must be in increasing order: {} to {}",
                start, end
            )));
        }
        let loaded = self.load_window(Window::Date(TimeRange::new(start, end)))?;
        Ok(self.keep(loaded))
    }

    /// Load `name`, or the files from `name` through `stop_name`.
    pub fn load_file(&mut self, name: &str, stop_name: Option<&str>) -> Result<&S::Data> {
        let first = self.inventory.index_of(name)?;
        let last = match stop_name {
            Some(stop) => self.inventory.index_of(stop)?,
            None => first,
        };
        if last < first {
            return Err(InstrumentError::InvalidBounds(format!(
                "Load range must be in increasing order: {} to {}",
                name,
                stop_name.unwrap_or_default()
            )));
        }
        let window = self.file_window(first, last)?;
        let loaded = self.load_window(window)?;
        Ok(self.keep(loaded))
    }

    /// Walk every window from the start of the bounds.
    ///
    /// Ends when the bounds are exhausted. Other errors are yielded and end
    /// the walk.
    pub fn iter(&mut self) -> Windows<'_, S> {
        self.current = None;
        self.cursor = None;
        Windows {
            instrument: self,
            done: false,
        }
    }

    /// Fetch files for every day from `start` through `stop`, then re-list.
    pub fn download(&mut self, start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<()> {
        let dates = date_range(floor_to_day(start), floor_to_day(stop), Freq::DAILY);
        info!(instrument = %self.id, days = dates.len(), "Downloading");
        self.source
            .download(&dates, self.inventory.data_path())
            .map_err(InstrumentError::Download)?;
        self.refresh()
    }

    /// Files available from the source's remote archive.
    pub fn remote_files(&self) -> Result<FileTable> {
        self.source.list_remote_files().map_err(InstrumentError::Download)
    }

    fn keep(&mut self, loaded: Loaded<S::Data>) -> &S::Data {
        self.data.insert(loaded.data)
    }

    fn step(&mut self, direction: Direction) -> Result<Loaded<S::Data>> {
        if self.inventory.is_empty() {
            return Err(InstrumentError::Stop(StopReason::EmptyFileList));
        }
        let len = self.bounds.len();
        if len == 0 {
            return Err(InstrumentError::Stop(StopReason::OutsideBounds));
        }

        let target = match (&self.current, self.cursor) {
            (None, _) => match direction {
                Direction::Forward => 0,
                Direction::Backward => len - 1,
            },
            (Some(_), Some(idx)) => neighbour(idx, len, direction)?,
            (Some(current), None) => {
                // Loaded directly: continue from the far copy in the walk direction.
                let idx = match direction {
                    Direction::Forward => self.bounds.last_position(current),
                    Direction::Backward => self.bounds.position(current),
                }
                .ok_or_else(|| InstrumentError::Stop(StopReason::NotInIteration(current.to_string())))?;
                neighbour(idx, len, direction)?
            }
        };

        let window = self.bounds.windows()[target].clone();
        let loaded = self.load_window(window)?;
        self.cursor = Some(target);
        Ok(loaded)
    }

    fn file_window(&self, first: usize, last: usize) -> Result<Window> {
        match (self.inventory.get(first), self.inventory.get(last)) {
            (Some(a), Some(b)) => Ok(Window::Files {
                first: a.file.clone(),
                last: b.file.clone(),
                start: a.time,
                stop: b.time,
            }),
            _ => Err(InstrumentError::InvalidBounds(format!(
                "File positions {}..={} are outside the file list",
                first, last
            ))),
        }
    }

    /// Files the loader receives for `window`.
    fn files_for(&self, window: &Window, padded: &TimeRange) -> Vec<String> {
        let table = self.inventory.table();
        match window {
            Window::Files { first, last, .. } if self.pad.is_none() => {
                match (table.position(first), table.position(last)) {
                    (Some(a), Some(b)) => table.entries()[a..=b].iter().map(|e| e.file.clone()).collect(),
                    _ => Vec::new(),
                }
            }
            _ => {
                let range = table.range_half_open(padded.start, padded.end);
                table.entries()[range].iter().map(|e| e.file.clone()).collect()
            }
        }
    }

    #[instrument(skip(self, window), fields(instrument = %self.id, window = %window))]
    fn load_window(&mut self, window: Window) -> Result<Loaded<S::Data>> {
        let nominal = window.time_range();
        let padded = match self.pad {
            Some(pad) => nominal.padded(pad),
            None => nominal,
        };
        let files = self.files_for(&window, &padded);
        if files.is_empty() {
            warn!("No files in window");
        }

        let request = LoadRequest {
            data_path: self.inventory.data_path().to_path_buf(),
            files,
            window: nominal,
            padded,
        };
        let mut data = self.source.load(&request).map_err(InstrumentError::Load)?;
        self.source.clean(&mut data).map_err(InstrumentError::Load)?;

        counter!("instrument_loads_total").increment(1);
        debug!(files = request.files.len(), "Loaded window");

        self.current = Some(window.clone());
        self.cursor = None;
        Ok(Loaded {
            window,
            files: request.files,
            data,
        })
    }
}

fn neighbour(idx: usize, len: usize, direction: Direction) -> Result<usize> {
    match direction {
        Direction::Forward if idx + 1 < len => Ok(idx + 1),
        Direction::Backward if idx > 0 => Ok(idx - 1),
        _ => Err(InstrumentError::Stop(StopReason::OutsideBounds)),
    }
}

/// Date step used when bounds do not give one.
fn native_step<S: InstrumentSource>(source: &S) -> Freq {
    let cadence = source.cadence();
    if cadence.is_daily_or_finer() {
        cadence.freq()
    } else {
        Freq::DAILY
    }
}

/// Iterator over the windows of an [`Instrument`].
pub struct Windows<'a, S: InstrumentSource> {
    instrument: &'a mut Instrument<S>,
    done: bool,
}

impl<'a, S: InstrumentSource + 'static> Iterator for Windows<'a, S> {
    type Item = Result<Loaded<S::Data>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.instrument.step(Direction::Forward) {
            Ok(loaded) => Some(Ok(loaded)),
            Err(e) if e.is_stop() => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
