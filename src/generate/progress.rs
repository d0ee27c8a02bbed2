use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::state::request::BYTES_PER_MB;

/// Point-in-time view of a run, emitted after every chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub bytes_written: u64,
    pub target_size: u64,
    /// 0 to 100.
    pub percent: f64,
    /// Average rate since the run started.
    pub throughput_bps: f64,
    /// `None` while no rate is known yet.
    pub eta_secs: Option<f64>,
    pub elapsed_secs: f64,
}

impl ProgressSnapshot {
    pub fn compute(written: u64, target: u64, elapsed: Duration) -> Self {
        let percent = if target == 0 {
            100.0
        } else {
            (written as f64 / target as f64) * 100.0
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let throughput_bps = if elapsed_secs > 0.0 {
            written as f64 / elapsed_secs
        } else {
            0.0
        };

        let remaining = target.saturating_sub(written);
        let eta_secs = if throughput_bps > 0.0 {
            Some(remaining as f64 / throughput_bps)
        } else {
            None
        };

        Self {
            bytes_written: written,
            target_size: target,
            percent,
            throughput_bps,
            eta_secs,
            elapsed_secs,
        }
    }

    pub fn throughput_mb_per_sec(&self) -> f64 {
        self.throughput_bps / BYTES_PER_MB as f64
    }

    pub fn eta_minutes(&self) -> Option<f64> {
        self.eta_secs.map(|secs| secs / 60.0)
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% | Speed: {:.2} MB/s | ETA: ",
            self.percent,
            self.throughput_mb_per_sec()
        )?;
        match self.eta_minutes() {
            Some(minutes) => write!(f, "{:.2} min", minutes),
            None => write!(f, "-- min"),
        }
    }
}
