//! File listing strategies.

use std::path::Path;

use filename_template::{extract_delimited, extract_fixed_width, FormatTemplate, SearchPattern};
use tracing::{debug, instrument};

use crate::cadence::{normalize, Cadence};
use crate::error::Result;
use crate::scanner::{scan, ScanOptions};
use crate::table::{FileTable, FileTableBuilder};

/// Produces the file table for a data directory.
pub trait FileListing: Send + Sync {
    fn list_files(&self, data_path: &Path) -> Result<FileTable>;
}

/// How filename fields are located.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Fields sit at fixed character offsets; every field needs a width.
    #[default]
    FixedWidth,
    /// Fields are separated by a delimiter string.
    Delimited(String),
}

/// Lists files on the local disk that match a filename template.
#[derive(Debug, Clone)]
pub struct LocalFileListing {
    template: FormatTemplate,
    mode: ParseMode,
    builder: FileTableBuilder,
    cadence: Cadence,
    scan: ScanOptions,
}

impl LocalFileListing {
    pub fn new(template: FormatTemplate) -> Self {
        Self {
            template,
            mode: ParseMode::FixedWidth,
            builder: FileTableBuilder::new(),
            cadence: Cadence::daily(),
            scan: ScanOptions::default(),
        }
    }

    pub fn parse(template: &str) -> Result<Self> {
        Ok(Self::new(FormatTemplate::parse(template)?))
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.mode = ParseMode::Delimited(delimiter.into());
        self
    }

    pub fn two_digit_year_break(mut self, year_break: Option<i32>) -> Self {
        self.builder = self.builder.two_digit_year_break(year_break);
        self
    }

    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn ignore_empty_files(mut self, ignore: bool) -> Self {
        self.scan.ignore_empty_files = ignore;
        self
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.scan.follow_links = follow;
        self
    }

    pub fn template(&self) -> &FormatTemplate {
        &self.template
    }

    pub fn mode(&self) -> &ParseMode {
        &self.mode
    }

    pub fn file_cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn search_pattern(&self) -> Result<SearchPattern> {
        let pattern = match self.mode {
            ParseMode::FixedWidth => SearchPattern::fixed_width(&self.template)?,
            ParseMode::Delimited(_) => SearchPattern::wildcard(&self.template)?,
        };
        Ok(pattern)
    }
}

impl FileListing for LocalFileListing {
    #[instrument(skip(self), fields(template = %self.template))]
    fn list_files(&self, data_path: &Path) -> Result<FileTable> {
        let search = self.search_pattern()?;
        let names = scan(data_path, &search.pattern, &self.scan)?;

        let parsed = match &self.mode {
            ParseMode::FixedWidth => extract_fixed_width(&names, &self.template)?,
            ParseMode::Delimited(delimiter) => extract_delimited(&names, &self.template, delimiter)?,
        };
        let table = normalize(&self.builder.build(&parsed)?, &self.cadence);

        debug!(matched = names.len(), rows = table.len(), "Listed local files");
        Ok(table)
    }
}
