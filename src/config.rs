use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::generate::engine::DEFAULT_CHUNK_SIZE;
use crate::state::request::{DEFAULT_FILE_NAME, SizeUnit};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Bytes handed to a single write call.
    pub chunk_size: usize,
    pub output_dir: String,
    pub file_name: String,
    pub default_size: f64,
    pub default_unit: SizeUnit,
    /// fsync the file before reporting completion.
    pub sync_on_complete: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            output_dir: "".to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            default_size: 26.0,
            default_unit: SizeUnit::Gb,
            sync_on_complete: false,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let config = match fs::read_to_string(path) {
            Ok(toml_str) => Self::from_toml(&toml_str).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "failed to parse config, using defaults");
                Config::default()
            }),
            Err(_) => {
                info!(path = %path.display(), "config not found, using defaults");
                Config::default()
            }
        };
        config.sanitized()
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    fn sanitized(mut self) -> Self {
        if self.chunk_size == 0 {
            warn!("chunk_size must be positive, falling back to {DEFAULT_CHUNK_SIZE}");
            self.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        if self.file_name.trim().is_empty() {
            self.file_name = DEFAULT_FILE_NAME.to_string();
        }
        self
    }
}
