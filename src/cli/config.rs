// ABOUTME: Configuration management for the xscaffold application
// ABOUTME: Loads the per-user flat YAML config, applies environment overrides and saves it back

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::executor::DEFAULT_URL_BASE;
use crate::engine::EngineSettings;

const CONFIG_FILE_NAME: &str = ".xscaffold";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,

    pub log_level: String,

    /// `pretty` or `compact`
    pub log_format: String,

    pub strict_acquisition: bool,

    pub propagate_child_notes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            temp_dir: None,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            strict_acquisition: false,
            propagate_child_notes: false,
        }
    }
}

impl Config {
    /// `~/.xscaffold`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a path or the default location, then apply environment overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path.or_else(Self::default_path) {
            Some(path) => Self::read_file(&path)?.unwrap_or_default(),
            None => Self::default(),
        };
        config.merge_env();
        Ok(config)
    }

    /// Read a config file as stored, `None` when it does not exist
    pub fn read_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Some(Self::default()));
        }
        Ok(Some(serde_yaml::from_str(&contents)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) {
        self.merge_env_from(|name| std::env::var(name).ok());
    }

    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("XSCAFFOLD_URL") {
            self.url = Some(url);
        }
        if let Some(temp_dir) = lookup("XSCAFFOLD_TEMP_DIR") {
            self.temp_dir = Some(PathBuf::from(temp_dir));
        }
        if let Some(level) = lookup("XSCAFFOLD_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(format) = lookup("XSCAFFOLD_LOG_FORMAT") {
            self.log_format = format;
        }
    }

    /// Command line values take precedence over file and environment
    pub fn apply_overrides(
        &mut self,
        url: Option<String>,
        temp_dir: Option<PathBuf>,
        log_level: Option<String>,
    ) {
        if url.is_some() {
            self.url = url;
        }
        if temp_dir.is_some() {
            self.temp_dir = temp_dir;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
    }

    pub fn effective_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| DEFAULT_URL_BASE.to_string())
    }

    pub fn effective_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            url_base: self.effective_url(),
            temp_dir: self.effective_temp_dir(),
            strict_acquisition: self.strict_acquisition,
            propagate_child_notes: self.propagate_child_notes,
            ..EngineSettings::default()
        }
    }
}
