//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use file_inventory::{Cadence, FileMarker, InstrumentId, Inventory, LocalFileListing, Settings};
use instrument::{BoundsRequest, FileEcho, Instrument, Stride};
use inventory_common::{parse_date, Freq};
use tracing::{info, warn};

use crate::InstrumentArgs;

/// Bounds options for `iterate`.
#[derive(Debug, Clone, Default)]
pub struct IterateOptions {
    pub starts: Vec<String>,
    pub stops: Vec<String>,
    pub step: Option<String>,
    pub width: Option<String>,
    pub reverse: bool,
}

impl InstrumentArgs {
    fn id(&self) -> InstrumentId {
        InstrumentId::new(&self.platform, &self.name)
            .with_tag(&self.tag)
            .with_inst_id(&self.inst_id)
    }

    fn listing(&self, settings: &Settings) -> Result<LocalFileListing> {
        let cadence: Freq = self
            .cadence
            .parse()
            .with_context(|| format!("Invalid cadence '{}'", self.cadence))?;
        let mut listing = LocalFileListing::parse(&self.template)?
            .cadence(Cadence::new(cadence))
            .two_digit_year_break(self.two_digit_year_break)
            .ignore_empty_files(settings.ignore_empty_files);
        if let Some(delimiter) = &self.delimiter {
            listing = listing.delimiter(delimiter.clone());
        }
        Ok(listing)
    }

    fn open(&self, settings: &Settings) -> Result<Instrument<FileEcho>> {
        let source = FileEcho::new(self.listing(settings)?);
        let instrument = match &self.data_path {
            Some(path) => Instrument::with_data_path(self.id(), source, path.clone())?,
            None => Instrument::new(self.id(), source, settings)?,
        };
        Ok(instrument)
    }
}

/// A filename when `inventory` lists one by that name, else a date when the
/// text parses as one, else a filename.
fn parse_marker(text: &str, inventory: &Inventory) -> FileMarker {
    if inventory.table().contains_file(text) {
        return FileMarker::File(text.to_string());
    }
    match parse_date(text) {
        Ok(date) => FileMarker::Date(date),
        Err(_) => FileMarker::File(text.to_string()),
    }
}

/// A bare count is a number of files, anything else a frequency.
fn parse_stride(text: &str) -> Result<Stride> {
    if let Ok(count) = text.trim().parse::<usize>() {
        return Ok(Stride::Files(count));
    }
    let freq: Freq = text
        .parse()
        .with_context(|| format!("'{}' is neither a file count nor a frequency", text))?;
    Ok(Stride::Freq(freq))
}

fn bounds_request(options: &IterateOptions, inventory: &Inventory) -> Result<BoundsRequest> {
    let mut request = BoundsRequest::season(
        options.starts.iter().map(|s| parse_marker(s, inventory)),
        options.stops.iter().map(|s| parse_marker(s, inventory)),
    );
    if let Some(step) = &options.step {
        request = request.with_step(parse_stride(step)?);
    }
    if let Some(width) = &options.width {
        request = request.with_width(parse_stride(width)?);
    }
    Ok(request)
}

pub fn list(
    settings: &Settings,
    args: &InstrumentArgs,
    start: Option<&str>,
    stop: Option<&str>,
) -> Result<()> {
    let instrument = args.open(settings)?;
    let inventory = instrument.inventory();
    println!("{}", inventory);

    let start = start.map(parse_date).transpose()?.or(inventory.start_date());
    let stop = stop.map(parse_date).transpose()?.or(inventory.stop_date());
    if let (Some(start), Some(stop)) = (start, stop) {
        for file in inventory.files_between(start, stop) {
            println!("{}", file);
        }
    }
    Ok(())
}

pub fn new_files(settings: &Settings, args: &InstrumentArgs) -> Result<()> {
    let mut instrument = args.open(settings)?;
    let new = instrument.get_new()?;
    if new.is_empty() {
        println!("No new files");
    }
    for entry in &new {
        println!("{}  {}", entry.time.format("%Y-%m-%d %H:%M:%S"), entry.file);
    }
    Ok(())
}

pub fn iterate(settings: &Settings, args: &InstrumentArgs, options: &IterateOptions) -> Result<()> {
    let mut instrument = args.open(settings)?;
    let request = bounds_request(options, instrument.inventory())?;
    instrument.set_bounds(request)?;
    if instrument.inventory().is_empty() {
        println!("No files found in {}", instrument.inventory().data_path().display());
        return Ok(());
    }

    loop {
        let step = if options.reverse {
            instrument.prev()
        } else {
            instrument.next()
        };
        let files = match step {
            Ok(files) => files.clone(),
            Err(e) if e.is_stop() => break,
            Err(e) => return Err(e.into()),
        };
        if let Some(window) = instrument.current() {
            println!("{}", window);
        }
        for file in files {
            println!("  {}", file);
        }
    }
    Ok(())
}

pub async fn watch(settings: &Settings, args: &InstrumentArgs, interval: u64) -> Result<()> {
    let mut instrument = args.open(settings)?;
    info!(
        instrument = %instrument.id(),
        files = instrument.inventory().len(),
        interval_secs = interval,
        "Watching for new files"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {
                match instrument.get_new() {
                    Ok(new) => {
                        for entry in &new {
                            println!("{}", entry.file);
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to check for new files"),
                }
            }
        }
    }
    Ok(())
}

pub fn show_settings(path: &Path) -> Result<()> {
    let settings = Settings::load_or_default(path)?;
    println!("# {}", path.display());
    print!("{}", settings.to_yaml()?);
    Ok(())
}

pub fn init_settings(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Settings already exist at {}", path.display());
        return Ok(());
    }
    Settings::default().save(path)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

pub fn add_data_dir(path: &Path, data_dir: PathBuf) -> Result<()> {
    let mut settings = Settings::load_or_default(path)?;
    settings.data_dirs.retain(|d| d != &data_dir);
    settings.data_dirs.insert(0, data_dir);
    settings.save(path)?;
    Ok(())
}

pub fn set_directory_format(path: &Path, format: String) -> Result<()> {
    let mut settings = Settings::load_or_default(path)?;
    settings.directory_format = format;
    settings.save(path)?;
    Ok(())
}
