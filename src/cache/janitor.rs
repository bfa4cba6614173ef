//! Background reclamation of expired cache entries.
//!
//! Recompressed entries (`*.compressed`) and temporary files orphaned by an
//! interrupted write (`.*.tmp`) are swept. Resized entries are left alone;
//! they are overwritten whenever their source changes.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::error::SweepError;

use super::key::{COMPRESSED_SUFFIX, TEMP_SUFFIX};

/// Default interval between sweeps (1 hour).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default retention for recompressed entries (7 days).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Outcome of a completed sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files examined
    pub scanned: usize,

    /// Expired entries deleted
    pub removed: usize,
}

/// Delete every `*.compressed` and orphaned `.*.tmp` file under `cache_dir`
/// older than `max_age`.
///
/// A missing directory is not an error. The first traversal or deletion
/// failure aborts the sweep and is returned.
pub fn sweep(cache_dir: &Path, max_age: Duration) -> Result<SweepReport, SweepError> {
    let mut report = SweepReport::default();

    if !cache_dir.exists() {
        return Ok(report);
    }

    // A retention longer than the epoch leaves nothing to delete.
    let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
        return Ok(report);
    };

    for entry in WalkDir::new(cache_dir) {
        let entry = entry.map_err(|e| SweepError::Walk {
            message: e.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        report.scanned += 1;

        if !entry.file_name().to_str().is_some_and(is_sweepable) {
            continue;
        }

        let modified = entry
            .metadata()
            .map_err(|e| SweepError::Walk {
                message: e.to_string(),
            })?
            .modified()
            .map_err(|e| SweepError::Walk {
                message: e.to_string(),
            })?;

        if modified < cutoff {
            std::fs::remove_file(entry.path()).map_err(|e| SweepError::Remove {
                path: entry.path().display().to_string(),
                message: e.to_string(),
            })?;
            debug!(path = %entry.path().display(), "Removed expired cache entry");
            report.removed += 1;
        }
    }

    Ok(report)
}

fn is_sweepable(name: &str) -> bool {
    name.ends_with(COMPRESSED_SUFFIX) || (name.starts_with('.') && name.ends_with(TEMP_SUFFIX))
}

/// Periodic sweeper running on its own task.
///
/// # Example
///
/// ```ignore
/// use quill_media::cache::CacheJanitor;
///
/// let handle = CacheJanitor::new("content/cache").spawn();
/// ```
#[derive(Debug, Clone)]
pub struct CacheJanitor {
    cache_dir: PathBuf,
    interval: Duration,
    max_age: Duration,
}

impl CacheJanitor {
    /// Create a janitor with the default interval and retention.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            interval: DEFAULT_SWEEP_INTERVAL,
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Set the time between sweeps.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the retention for recompressed entries.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Run one sweep on the blocking pool and log its outcome.
    pub async fn run_once(&self) -> Result<SweepReport, SweepError> {
        let cache_dir = self.cache_dir.clone();
        let max_age = self.max_age;

        let result = tokio::task::spawn_blocking(move || sweep(&cache_dir, max_age))
            .await
            .unwrap_or_else(|e| {
                Err(SweepError::Walk {
                    message: e.to_string(),
                })
            });

        match &result {
            Ok(report) => info!(
                scanned = report.scanned,
                removed = report.removed,
                "Image cache cleanup completed"
            ),
            Err(e) => error!(error = %e, "Error cleaning up image cache"),
        }

        result
    }

    /// Start sweeping every interval. The first sweep runs one interval
    /// after this call.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                // Failures are logged; the next tick retries.
                let _ = self.run_once().await;
            }
        })
    }
}
