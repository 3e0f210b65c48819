//! Configuration for promptweave

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directories searched for template files, in order
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,

    /// Extension tried after the bare template name
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Maximum nesting of file includes before resolution is aborted
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,

    /// Pattern used by `func:date` when none is given
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_search_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("prompts"), PathBuf::from(".")]
}

fn default_extension() -> String {
    crate::DEFAULT_EXTENSION.to_string()
}

fn default_max_include_depth() -> usize {
    crate::DEFAULT_MAX_INCLUDE_DEPTH
}

fn default_date_format() -> String {
    crate::DEFAULT_DATE_FORMAT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            extension: default_extension(),
            max_include_depth: default_max_include_depth(),
            date_format: default_date_format(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!(?config_path, "Config::load: explicit path");
            return Self::load_from(config_path);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("promptweave").join("config.yml")),
            Some(PathBuf::from("promptweave.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                debug!(?path, "Config::load: found default config");
                return Self::load_from(path);
            }
        }

        debug!("Config::load: no config file, using defaults");
        Ok(Config::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .context(format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
