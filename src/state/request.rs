use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ValidationError;

/// File name used when generating into a folder.
pub const DEFAULT_FILE_NAME: &str = "tool generated file.txt";

pub const BYTES_PER_MB: u64 = 1024 * 1024;
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum SizeUnit {
    #[serde(rename = "MB")]
    Mb,
    #[serde(rename = "GB")]
    Gb,
}

impl SizeUnit {
    pub fn bytes(self) -> u64 {
        match self {
            SizeUnit::Mb => BYTES_PER_MB,
            SizeUnit::Gb => BYTES_PER_GB,
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeUnit::Mb => write!(f, "MB"),
            SizeUnit::Gb => write!(f, "GB"),
        }
    }
}

impl FromStr for SizeUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MB" => Ok(SizeUnit::Mb),
            "GB" => Ok(SizeUnit::Gb),
            _ => Err(ValidationError::UnknownUnit(s.to_string())),
        }
    }
}

impl TryFrom<String> for SizeUnit {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Parses a user-entered size such as `"26"` or `" 1.5 "`.
pub fn parse_size_value(input: &str) -> Result<f64, ValidationError> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber(input.to_string()))?;
    check_positive(value)?;
    Ok(value)
}

fn check_positive(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NonPositiveSize(value));
    }
    Ok(())
}

/// What to generate: a destination and an exact byte length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    path: PathBuf,
    target_size: u64,
}

impl GenerationRequest {
    pub fn new(path: impl Into<PathBuf>, target_size: u64) -> Result<Self, ValidationError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ValidationError::MissingDestination);
        }
        if target_size == 0 {
            return Err(ValidationError::NonPositiveSize(0.0));
        }
        Ok(Self { path, target_size })
    }

    /// Converts `value` `unit` to bytes, truncating any fractional byte.
    pub fn from_size(
        path: impl Into<PathBuf>,
        value: f64,
        unit: SizeUnit,
    ) -> Result<Self, ValidationError> {
        check_positive(value)?;
        let bytes = (value * unit.bytes() as f64) as u64;
        if bytes == 0 {
            return Err(ValidationError::ZeroBytes {
                value,
                unit: unit.to_string(),
            });
        }
        Self::new(path, bytes)
    }

    pub fn in_folder(
        folder: impl AsRef<Path>,
        file_name: &str,
        value: f64,
        unit: SizeUnit,
    ) -> Result<Self, ValidationError> {
        let folder = folder.as_ref();
        if folder.as_os_str().is_empty() {
            return Err(ValidationError::MissingDestination);
        }
        Self::from_size(folder.join(file_name), value, unit)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn target_size(&self) -> u64 {
        self.target_size
    }
}
