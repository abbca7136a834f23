//! User settings: data directories, directory layout and the file-list
//! archive location.
//!
//! Settings live in a YAML file. `${VAR}` and `${VAR:-default}` are
//! expanded from the environment before parsing.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use filename_template::{FieldValue, FormatTemplate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{InventoryError, Result};

/// Overrides the settings file location.
pub const SETTINGS_PATH_ENV: &str = "INSTRUMENT_FILES_SETTINGS";

const SETTINGS_DIR: &str = ".instrument_files";
const DIRECTORY_FIELDS: [&str; 4] = ["platform", "name", "tag", "inst_id"];

/// Identifies one instrument data product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentId {
    pub platform: String,
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub inst_id: String,
}

impl InstrumentId {
    pub fn new(platform: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            name: name.into(),
            tag: String::new(),
            inst_id: String::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_inst_id(mut self, inst_id: impl Into<String>) -> Self {
        self.inst_id = inst_id.into();
        self
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "platform" => &self.platform,
            "name" => &self.name,
            "tag" => &self.tag,
            "inst_id" => &self.inst_id,
            _ => return None,
        };
        Some(FieldValue::Text(value.clone()))
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.platform, self.name)?;
        if !self.tag.is_empty() {
            write!(f, "_{}", self.tag)?;
        }
        if !self.inst_id.is_empty() {
            write!(f, "_{}", self.inst_id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Roots searched for instrument data; the first one is used.
    #[serde(default)]
    pub data_dirs: Vec<PathBuf>,

    /// Layout of an instrument's directory below a data root.
    #[serde(default = "default_directory_format")]
    pub directory_format: String,

    #[serde(default)]
    pub ignore_empty_files: bool,

    /// Re-list the data directory whenever an instrument is created.
    #[serde(default = "default_update_files")]
    pub update_files: bool,

    /// Where stored file lists are kept. Defaults to
    /// `~/.instrument_files/archive`.
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
}

fn default_update_files() -> bool {
    true
}

fn default_directory_format() -> String {
    "{platform}/{name}/{tag}/{inst_id}".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dirs: Vec::new(),
            directory_format: default_directory_format(),
            ignore_empty_files: false,
            update_files: default_update_files(),
            archive_dir: None,
        }
    }
}

impl Settings {
    /// `$INSTRUMENT_FILES_SETTINGS`, else `~/.instrument_files/settings.yaml`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        settings_home().join("settings.yaml")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content)?;
        let settings: Settings = serde_yaml::from_str(&expanded)?;
        settings.validate()?;
        debug!(path = %path.display(), data_dirs = settings.data_dirs.len(), "Loaded settings");
        Ok(settings)
    }

    /// Load `path`, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "No settings file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_yaml()?)?;
        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let template = FormatTemplate::parse(&self.directory_format)?;
        if let Some(field) = template
            .fields()
            .find(|f| !DIRECTORY_FIELDS.contains(&f.name()))
        {
            return Err(InventoryError::InvalidConfig(format!(
                "directory_format field '{}' must be one of {:?}",
                field.name(),
                DIRECTORY_FIELDS
            )));
        }
        Ok(())
    }

    /// The directory holding `id`'s files below the first data root.
    pub fn data_path_for(&self, id: &InstrumentId) -> Result<PathBuf> {
        let root = self.data_dirs.first().ok_or_else(|| {
            InventoryError::InvalidConfig("No data directories set".to_string())
        })?;
        let template = FormatTemplate::parse(&self.directory_format)?;
        let relative = template.format_with(|name| id.field(name))?;

        let mut path = root.clone();
        for part in relative.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        Ok(path)
    }

    /// Like [`Settings::data_path_for`], creating the directory if needed.
    pub fn ensure_data_path(&self, id: &InstrumentId) -> Result<PathBuf> {
        let path = self.data_path_for(id)?;
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// File holding the stored file list for `id`.
    pub fn archive_path_for(&self, id: &InstrumentId) -> PathBuf {
        let root = self
            .archive_dir
            .clone()
            .unwrap_or_else(|| settings_home().join("archive"));
        root.join(&id.platform)
            .join(&id.name)
            .join(format!("{}_{}_file_list.json", id.tag, id.inst_id))
    }
}

fn settings_home() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(SETTINGS_DIR))
        .unwrap_or_else(|| PathBuf::from(SETTINGS_DIR))
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut expr = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) => expr.push(c),
                None => {
                    return Err(InventoryError::InvalidConfig(format!(
                        "Unclosed variable substitution: ${{{}",
                        expr
                    )))
                }
            }
        }
        result.push_str(&resolve_var(&expr)?);
    }

    Ok(result)
}

fn resolve_var(expr: &str) -> Result<String> {
    if let Some((name, default)) = expr.split_once(":-") {
        return Ok(match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => value,
            _ => default.to_string(),
        });
    }
    std::env::var(expr.trim()).map_err(|_| {
        InventoryError::InvalidConfig(format!("Environment variable {} not set", expr.trim()))
    })
}
