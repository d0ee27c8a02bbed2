use crate::config::Config;
use crate::error::{StartError, ValidationError};
use crate::generate::engine::{Outcome, WriterEngine};
use crate::generate::progress::ProgressSnapshot;
use crate::state::request::{GenerationRequest, SizeUnit, parse_size_value};
use crate::state::session::CancelToken;

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationStatus {
    Idle,
    Writing,
    Completed,
    Cancelled,
    /// Stopped, but the partial file could not be deleted.
    CleanupFailed(String),
    Failed(String),
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStatus::Idle => write!(f, "Idle"),
            GenerationStatus::Writing => write!(f, "Writing"),
            GenerationStatus::Completed => write!(f, "Completed"),
            GenerationStatus::Cancelled => write!(f, "Cancelled"),
            GenerationStatus::CleanupFailed(reason) => {
                write!(f, "Cancelled, partial file left ({})", reason)
            }
            GenerationStatus::Failed(reason) => write!(f, "Failed ({})", reason),
        }
    }
}

impl From<&Outcome> for GenerationStatus {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Completed { .. } => GenerationStatus::Completed,
            Outcome::Cancelled { .. } => GenerationStatus::Cancelled,
            Outcome::CleanupFailed { error, .. } => {
                GenerationStatus::CleanupFailed(error.clone())
            }
            Outcome::Failed { error, .. } => GenerationStatus::Failed(error.clone()),
        }
    }
}

/// Everything a run reports, in order: progress, then exactly one `Finished`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    Progress(ProgressSnapshot),
    Finished(Outcome),
}

/// Caller's side of a run. Dropping it detaches the writer thread; the run
/// still finishes and cleans up on its own.
pub struct SessionHandle {
    id: String,
    path: PathBuf,
    cancel: CancelToken,
    status: Arc<Mutex<GenerationStatus>>,
    latest: Arc<Mutex<Option<ProgressSnapshot>>>,
    events: Receiver<SessionEvent>,
    handle: Option<JoinHandle<Outcome>>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Asks the writer to stop at the next chunk boundary. Safe to call any
    /// number of times, including after the run has ended.
    pub fn cancel(&self) {
        if self.is_finished() {
            debug!(id = %self.id, "cancel ignored, run already finished");
            return;
        }
        info!(id = %self.id, "cancelling file generation");
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    pub fn status(&self) -> GenerationStatus {
        lock(&self.status).clone()
    }

    /// Most recent snapshot, if any chunk has been written.
    pub fn progress(&self) -> Option<ProgressSnapshot> {
        lock(&self.latest).clone()
    }

    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Blocks until the run reaches its terminal outcome.
    pub fn wait(mut self) -> Outcome {
        let Some(handle) = self.handle.take() else {
            return self.panicked();
        };
        match handle.join() {
            Ok(outcome) => outcome,
            Err(_) => self.panicked(),
        }
    }

    fn panicked(&self) -> Outcome {
        let error = "writer thread panicked".to_string();
        *lock(&self.status) = GenerationStatus::Failed(error.clone());
        Outcome::Failed {
            path: self.path.clone(),
            bytes_written: self.progress().map_or(0, |p| p.bytes_written),
            error,
        }
    }
}

/// Releases a destination when its run ends, even by panic.
struct ActiveGuard {
    active: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.path);
    }
}

pub struct SessionController {
    config: Arc<Config>,
    active: Arc<Mutex<HashSet<PathBuf>>>,
}

impl SessionController {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Builds a request from raw user input: a folder, a numeric size and a
    /// unit. The file name comes from the config.
    pub fn prepare(
        &self,
        folder: &str,
        size: &str,
        unit: &str,
    ) -> Result<GenerationRequest, ValidationError> {
        let value = parse_size_value(size)?;
        let unit: SizeUnit = unit.parse()?;
        if folder.trim().is_empty() {
            return Err(ValidationError::MissingDestination);
        }
        GenerationRequest::in_folder(folder, &self.config.file_name, value, unit)
    }

    pub fn start_from_input(
        &self,
        folder: &str,
        size: &str,
        unit: &str,
    ) -> Result<SessionHandle, StartError> {
        let request = self.prepare(folder, size, unit)?;
        self.start(request)
    }

    pub fn start(&self, request: GenerationRequest) -> Result<SessionHandle, StartError> {
        self.start_with_observer(request, |_| {})
    }

    /// Like `start`, with `observer` called on the writer thread for every
    /// snapshot before it is sent to the event channel.
    pub fn start_with_observer<O>(
        &self,
        request: GenerationRequest,
        mut observer: O,
    ) -> Result<SessionHandle, StartError>
    where
        O: FnMut(&ProgressSnapshot) + Send + 'static,
    {
        let path = request.path().to_path_buf();
        if !lock(&self.active).insert(path.clone()) {
            return Err(StartError::Busy(path));
        }
        let guard = ActiveGuard {
            active: Arc::clone(&self.active),
            path: path.clone(),
        };

        let id = session_id(&path);
        let cancel = CancelToken::new();
        let status = Arc::new(Mutex::new(GenerationStatus::Idle));
        let latest = Arc::new(Mutex::new(None));
        let (tx, rx) = mpsc::channel();
        let engine = WriterEngine::from_config(&self.config);

        let cancel_clone = cancel.clone();
        let status_clone = Arc::clone(&status);
        let latest_clone = Arc::clone(&latest);

        let handle = thread::Builder::new()
            .name(format!("generate-{}", &id[..8]))
            .spawn(move || {
                *lock(&status_clone) = GenerationStatus::Writing;
                let outcome = engine.run(&request, &cancel_clone, |snapshot| {
                    observer(snapshot);
                    *lock(&latest_clone) = Some(snapshot.clone());
                    let _ = tx.send(SessionEvent::Progress(snapshot.clone()));
                });

                *lock(&status_clone) = GenerationStatus::from(&outcome);
                drop(guard);
                let _ = tx.send(SessionEvent::Finished(outcome.clone()));
                outcome
            })
            .map_err(StartError::Spawn)?;

        info!(%id, path = %path.display(), "file generation dispatched");
        Ok(SessionHandle {
            id,
            path,
            cancel,
            status,
            latest,
            events: rx,
            handle: Some(handle),
        })
    }

    pub fn is_active(&self, path: &Path) -> bool {
        lock(&self.active).contains(path)
    }
}

/// Short stable id for a destination path.
pub fn session_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
