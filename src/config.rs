//! User configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::export::DEFAULT_EXPORT_FILE;

pub const DEFAULT_DATA_FILE: &str = "kanban_tasks.csv";

const APP_DIR: &str = "taskboard";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    #[serde(default)]
    pub export_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_file: PathBuf,
    pub export_file: String,
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

pub fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(Some(config))
}

impl Config {
    /// Command-line path first, then the config file, then the defaults.
    pub fn resolve(cli_data_file: Option<PathBuf>, file: Option<FileConfig>) -> Self {
        let file = file.unwrap_or_default();
        Self {
            data_file: cli_data_file
                .or(file.data_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
            export_file: file
                .export_file
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EXPORT_FILE.to_string()),
        }
    }

    pub fn load(cli_data_file: Option<PathBuf>) -> Result<Self> {
        let file = match config_path() {
            Some(path) => load_file_config(&path)?,
            None => None,
        };
        let config = Self::resolve(cli_data_file, file);
        debug!("Using task file {}", config.data_file.display());
        Ok(config)
    }
}
