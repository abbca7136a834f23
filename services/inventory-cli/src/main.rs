//! Instrument file inventory CLI.
//!
//! Lists the files an instrument has on disk, reports files added since the
//! last run, walks iteration windows and manages the settings file.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use file_inventory::{Settings, SETTINGS_PATH_ENV};

#[derive(Parser, Debug)]
#[command(name = "inventory")]
#[command(about = "Inventory and iterate over instrument data files", long_about = None)]
struct Cli {
    /// Settings file
    #[arg(long, global = true, env = SETTINGS_PATH_ENV)]
    settings: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Print Prometheus metrics collected during the run on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which instrument to work on and how its files are named.
#[derive(Args, Debug, Clone)]
pub struct InstrumentArgs {
    #[arg(long)]
    platform: String,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    tag: String,

    #[arg(long, default_value = "")]
    inst_id: String,

    /// Filename template, e.g. "cnofs_vefi_{year:04d}{month:02d}{day:02d}_v{version:02d}.cdf"
    #[arg(short, long)]
    template: String,

    /// Parse filenames by splitting on this delimiter instead of fixed widths
    #[arg(short, long)]
    delimiter: Option<String>,

    /// Time span of one file (e.g. 1D, 1H, 1MS)
    #[arg(long, default_value = "1D")]
    cadence: String,

    /// Two-digit years below this are in the 2000s
    #[arg(long)]
    two_digit_year_break: Option<i32>,

    /// Use this directory instead of the one from settings. No file list is
    /// stored between runs.
    #[arg(long)]
    data_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the files on disk
    List {
        #[command(flatten)]
        instrument: InstrumentArgs,

        /// Only files on or after this date
        #[arg(long)]
        start: Option<String>,

        /// Only files on or before this date
        #[arg(long)]
        stop: Option<String>,
    },

    /// Report files added since the last run
    New {
        #[command(flatten)]
        instrument: InstrumentArgs,
    },

    /// Walk the iteration windows and print the files in each
    Iterate {
        #[command(flatten)]
        instrument: InstrumentArgs,

        /// Window start, a date or a filename. Repeat for seasons.
        #[arg(long)]
        start: Vec<String>,

        /// Window stop, a date or a filename. Repeat for seasons.
        #[arg(long)]
        stop: Vec<String>,

        /// Step between windows: a frequency (2D) or a file count (3)
        #[arg(long)]
        step: Option<String>,

        /// Window width: a frequency (2D) or a file count (3)
        #[arg(long)]
        width: Option<String>,

        /// Walk from the last window to the first
        #[arg(long)]
        reverse: bool,
    },

    /// Poll for new files until interrupted
    Watch {
        #[command(flatten)]
        instrument: InstrumentArgs,

        /// Seconds between polls
        #[arg(long, default_value = "60")]
        interval: u64,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the settings in effect
    Show,

    /// Write a default settings file if none exists
    Init,

    /// Make a directory the primary data root
    AddDataDir { path: PathBuf },

    /// Change the directory layout below a data root
    SetFormat { format: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let metrics = if cli.metrics {
        Some(metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let settings_path = cli.settings.unwrap_or_else(Settings::default_path);
    debug!(path = %settings_path.display(), "Using settings file");

    match cli.command {
        Commands::List {
            instrument,
            start,
            stop,
        } => {
            let settings = Settings::load_or_default(&settings_path)?;
            commands::list(&settings, &instrument, start.as_deref(), stop.as_deref())?;
        }
        Commands::New { instrument } => {
            let settings = Settings::load_or_default(&settings_path)?;
            commands::new_files(&settings, &instrument)?;
        }
        Commands::Iterate {
            instrument,
            start,
            stop,
            step,
            width,
            reverse,
        } => {
            let settings = Settings::load_or_default(&settings_path)?;
            let options = commands::IterateOptions {
                starts: start,
                stops: stop,
                step,
                width,
                reverse,
            };
            commands::iterate(&settings, &instrument, &options)?;
        }
        Commands::Watch {
            instrument,
            interval,
        } => {
            let settings = Settings::load_or_default(&settings_path)?;
            commands::watch(&settings, &instrument, interval).await?;
        }
        Commands::Settings { command } => match command {
            SettingsCommand::Show => commands::show_settings(&settings_path)?,
            SettingsCommand::Init => commands::init_settings(&settings_path)?,
            SettingsCommand::AddDataDir { path } => {
                commands::add_data_dir(&settings_path, path)?
            }
            SettingsCommand::SetFormat { format } => {
                commands::set_directory_format(&settings_path, format)?
            }
        },
    }

    if let Some(handle) = metrics {
        print!("{}", handle.render());
    }

    Ok(())
}
