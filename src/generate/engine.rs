use serde::Serialize;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::WriteError;
use crate::generate::file::{LoopEnd, write_filler};
use crate::generate::progress::ProgressSnapshot;
use crate::state::request::GenerationRequest;
use crate::state::session::{CancelToken, WriteSession};

/// 100 MiB per write call.
pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024 * 1024;

/// Every byte of a generated file.
pub const FILL_BYTE: u8 = b'A';

/// Terminal state of a run. Nothing is reported after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Completed {
        path: PathBuf,
        bytes_written: u64,
    },
    Cancelled {
        path: PathBuf,
        bytes_written: u64,
        /// False when the partial file was already gone at cleanup time.
        partial_file_deleted: bool,
    },
    /// Stopped on request, but the partial file is still on disk.
    CleanupFailed {
        path: PathBuf,
        bytes_written: u64,
        error: String,
    },
    /// Open, write or sync failed. Bytes already flushed stay on disk.
    Failed {
        path: PathBuf,
        bytes_written: u64,
        error: String,
    },
}

impl Outcome {
    pub fn path(&self) -> &Path {
        match self {
            Outcome::Completed { path, .. }
            | Outcome::Cancelled { path, .. }
            | Outcome::CleanupFailed { path, .. }
            | Outcome::Failed { path, .. } => path,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        match self {
            Outcome::Completed { bytes_written, .. }
            | Outcome::Cancelled { bytes_written, .. }
            | Outcome::CleanupFailed { bytes_written, .. }
            | Outcome::Failed { bytes_written, .. } => *bytes_written,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Outcome::Cancelled { .. } | Outcome::CleanupFailed { .. }
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed { path, .. } => write!(f, "File created: {}", path.display()),
            Outcome::Cancelled {
                partial_file_deleted: true,
                ..
            } => write!(f, "File generation stopped. Partial file deleted."),
            Outcome::Cancelled { .. } => write!(f, "File generation stopped."),
            Outcome::CleanupFailed { error, .. } => {
                write!(f, "Stopped, but failed to delete file: {}", error)
            }
            Outcome::Failed { error, .. } => write!(f, "Error: {}", error),
        }
    }
}

/// Streams a constant-filled buffer to disk in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct WriterEngine {
    chunk_size: usize,
    sync_on_complete: bool,
}

impl Default for WriterEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl WriterEngine {
    /// A zero `chunk_size` means the default.
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            chunk_size,
            sync_on_complete: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.chunk_size).with_sync_on_complete(config.sync_on_complete)
    }

    pub fn with_sync_on_complete(mut self, sync: bool) -> Self {
        self.sync_on_complete = sync;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Generates `request` on the calling thread. `on_progress` runs after
    /// every chunk; `cancel` is checked between chunks.
    pub fn run<F>(&self, request: &GenerationRequest, cancel: &CancelToken, on_progress: F) -> Outcome
    where
        F: FnMut(&ProgressSnapshot),
    {
        let path = request.path().to_path_buf();
        let mut session = WriteSession::new(request.target_size(), cancel.clone());
        info!(
            path = %path.display(),
            target = request.target_size(),
            chunk_size = self.chunk_size,
            "starting file generation"
        );

        match self.write_file(&path, &mut session, on_progress) {
            Ok(LoopEnd::Completed) => {
                info!(path = %path.display(), bytes = session.written(), "file generation completed");
                Outcome::Completed {
                    path,
                    bytes_written: session.written(),
                }
            }
            Ok(LoopEnd::Cancelled) => remove_partial(path, session.written()),
            Err(err) => {
                error!(%err, "file generation failed");
                Outcome::Failed {
                    path,
                    bytes_written: session.written(),
                    error: err.to_string(),
                }
            }
        }
    }

    /// The file handle is closed before this returns.
    fn write_file<F>(
        &self,
        path: &Path,
        session: &mut WriteSession,
        on_progress: F,
    ) -> Result<LoopEnd, WriteError>
    where
        F: FnMut(&ProgressSnapshot),
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| WriteError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let buffer_len = usize::try_from(session.target())
            .map_or(self.chunk_size, |target| target.min(self.chunk_size));
        let chunk = vec![FILL_BYTE; buffer_len];

        let end = write_filler(&mut file, session, &chunk, on_progress).map_err(|source| {
            WriteError::Write {
                path: path.to_path_buf(),
                offset: session.written(),
                source,
            }
        })?;

        if end == LoopEnd::Completed && self.sync_on_complete {
            file.sync_all().map_err(|source| WriteError::Sync {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(end)
    }
}

fn remove_partial(path: PathBuf, bytes_written: u64) -> Outcome {
    match fs::remove_file(&path) {
        Ok(()) => {
            info!(path = %path.display(), bytes = bytes_written, "generation cancelled, partial file deleted");
            Outcome::Cancelled {
                path,
                bytes_written,
                partial_file_deleted: true,
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "generation cancelled, no partial file left");
            Outcome::Cancelled {
                path,
                bytes_written,
                partial_file_deleted: false,
            }
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "generation cancelled but partial file remains");
            Outcome::CleanupFailed {
                path,
                bytes_written,
                error: err.to_string(),
            }
        }
    }
}
