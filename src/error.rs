use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Rejected input, detected before any file is touched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("size must be a number, got {0:?}")]
    NotANumber(String),

    #[error("size must be a positive number, got {0}")]
    NonPositiveSize(f64),

    #[error("{value} {unit} is less than one byte")]
    ZeroBytes { value: f64, unit: String },

    #[error("unknown size unit {0:?} (expected MB or GB)")]
    UnknownUnit(String),

    #[error("no destination selected")]
    MissingDestination,
}

/// Errors from `SessionController::start`.
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("a generation run is already active for {}", .0.display())]
    Busy(PathBuf),

    #[error("failed to spawn writer thread: {0}")]
    Spawn(#[source] io::Error),
}

/// I/O failure inside the writer engine. Never leaves the engine as an
/// error; it is folded into `Outcome::Failed`.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot open {} for writing: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write failed at byte {offset} of {}: {source}", path.display())]
    Write {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to sync {} to disk: {source}", path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
