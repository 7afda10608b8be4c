//! Observable state for long-running comparisons.
//!
//! Provides [`JobState`] and [`JobHandle`]. A handle is shared between the
//! thread running a comparison and whoever polls it; it doubles as the
//! [`ProgressSink`] handed to [`find_duplicates`](crate::find_duplicates).
//!
//! # Usage
//!
//! ```rust
//! use sheetmatch_core::job::{JobHandle, JobState};
//!
//! let handle = JobHandle::new("job-1");
//! assert_eq!(handle.state(), JobState::Queued);
//!
//! handle.set_state(JobState::Loading);
//! handle.set_state(JobState::Done);
//! assert!(handle.state().is_finished());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

use crate::compare::ProgressSink;

// ============================================================================
// JobState
// ============================================================================

/// State of a comparison job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, not started.
    Queued,
    /// Reading the selected sheets.
    Loading,
    /// Walking File 1.
    Comparing {
        /// File 1 rows checked so far.
        checked: usize,
        /// File 1 rows in total.
        total: usize,
    },
    /// Finished successfully.
    Done,
    /// Stopped on request.
    Cancelled,
    /// Finished with an error.
    Failed {
        /// Error message.
        reason: String,
    },
}

impl JobState {
    /// Returns `true` once the job will not change state again.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed { .. })
    }

    /// Fraction of File 1 checked, from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        match self {
            Self::Queued | Self::Loading => 0.0,
            Self::Comparing { total: 0, .. } => 1.0,
            Self::Comparing { checked, total } => *checked as f64 / *total as f64,
            Self::Done | Self::Cancelled | Self::Failed { .. } => 1.0,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Loading => write!(f, "loading"),
            Self::Comparing { checked, total } => write!(f, "comparing: {checked}/{total}"),
            Self::Done => write!(f, "done"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

// ============================================================================
// JobHandle
// ============================================================================

/// Thread-safe handle for observing and updating a job.
///
/// Cheap to clone. State changes are broadcast to all subscribers via a
/// watch channel.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<JobHandleInner>,
}

struct JobHandleInner {
    name: String,
    tx: watch::Sender<JobState>,
    cancelled: AtomicBool,
    started_at: Instant,
}

impl JobHandle {
    /// Create a handle in [`JobState::Queued`].
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(JobState::Queued);
        Self {
            inner: Arc::new(JobHandleInner {
                name: name.into(),
                tx,
                cancelled: AtomicBool::new(false),
                started_at: Instant::now(),
            }),
        }
    }

    /// Job name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.inner.tx.borrow().clone()
    }

    /// Update the state. Finished jobs keep their final state.
    pub fn set_state(&self, state: JobState) {
        let changed = self.inner.tx.send_if_modified(|current| {
            if current.is_finished() {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            log::debug!("Job '{}' → {}", self.inner.name, self.state());
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.inner.tx.subscribe()
    }

    /// Ask the running comparison to stop at the next chunk boundary.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` if [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Relaxed)
    }

    /// Wait until the job finishes or the timeout passes.
    pub async fn wait_finished(&self, timeout: Duration) -> Result<JobState, String> {
        let mut rx = self.subscribe();
        let result = tokio::time::timeout(timeout, rx.wait_for(JobState::is_finished)).await;
        match result {
            Ok(Ok(state)) => Ok(state.clone()),
            Ok(Err(_)) => Err(format!("Job '{}' channel closed", self.inner.name)),
            Err(_) => Err(format!(
                "Job '{}' not finished after {timeout:?} (state: {})",
                self.inner.name,
                self.state()
            )),
        }
    }

    /// Elapsed time since the handle was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }
}

impl ProgressSink for JobHandle {
    fn report(&self, checked: usize, total: usize) {
        self.set_state(JobState::Comparing { checked, total });
    }

    fn should_stop(&self) -> bool {
        self.is_cancelled()
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
