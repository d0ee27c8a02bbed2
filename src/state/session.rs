use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::generate::progress::ProgressSnapshot;

/// Stop signal for a single run. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Mutable state of one run, from first chunk to terminal outcome.
#[derive(Debug)]
pub struct WriteSession {
    target: u64,
    written: u64,
    started: Instant,
    cancel: CancelToken,
}

impl WriteSession {
    pub fn new(target: u64, cancel: CancelToken) -> Self {
        Self {
            target,
            written: 0,
            started: Instant::now(),
            cancel,
        }
    }

    /// Adds `bytes` to the running total, clamped to the target.
    pub fn record(&mut self, bytes: u64) {
        self.written = self.written.saturating_add(bytes).min(self.target);
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn remaining(&self) -> u64 {
        self.target - self.written
    }

    pub fn is_complete(&self) -> bool {
        self.written >= self.target
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn should_stop(&self) -> bool {
        self.is_complete() || self.is_cancelled()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::compute(self.written, self.target, self.elapsed())
    }
}
