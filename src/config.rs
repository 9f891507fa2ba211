use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::codec::DEFAULT_QUALITY;

/// Input suffixes converted when nothing else is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Config file name looked up under the user's config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Conversion options that can be passed to the core library
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    pub input_dir: PathBuf,
    pub quality: u8,
    /// `None` = one worker per logical CPU
    pub workers: Option<usize>,
    pub extensions: Vec<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            quality: DEFAULT_QUALITY,
            workers: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

impl ConversionOptions {
    /// Create new conversion options with sensible defaults
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Default::default()
        }
    }

    /// Builder pattern for setting quality (clamped to 0-100)
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    /// Builder pattern for setting worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Builder pattern for setting input extensions
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        if !extensions.is_empty() {
            self.extensions = extensions;
        }
        self
    }

    /// Get the effective worker count (calculated if not set)
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Overlay values from a config file. Call before the other builders so
    /// command-line values win.
    pub fn apply_file(mut self, file: &FileConfig) -> Self {
        if let Some(quality) = file.quality {
            self = self.with_quality(quality);
        }
        if let Some(workers) = file.workers {
            self = self.with_workers(workers);
        }
        if let Some(extensions) = &file.extensions {
            self = self.with_extensions(extensions.clone());
        }
        self
    }
}

/// Optional TOML configuration file
///
/// ```toml
/// quality = 85
/// workers = 4
/// extensions = ["jpg", "jpeg", "png"]
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub quality: Option<u8>,
    pub workers: Option<usize>,
    pub extensions: Option<Vec<String>>,
}

impl FileConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("In config file {}", path.display()))
    }

    /// `<config_dir>/webpbatch/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE_NAME))
    }

    /// Load the explicit file if given, else the default file if it exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("Using config file {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}
