//! Shared server state: uploads, jobs, and their eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sheetmatch_core::{
    find_duplicates, CompareOptions, Comparison, JobHandle, JobState, Notice, SheetSelection,
    SheetmatchConfig, Workbook,
};
use tokio::sync::RwLock;
use uuid::Uuid;

// ============================================================================
// Store
// ============================================================================

struct Entry<T> {
    value: Arc<T>,
    created: Instant,
}

/// In-memory map from id to value with a time-to-live.
pub struct Store<T> {
    entries: Arc<RwLock<HashMap<Uuid, Entry<T>>>>,
    ttl: Duration,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            ttl: self.ttl,
        }
    }
}

impl<T> Store<T> {
    /// Create an empty store.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Insert a value under a fresh id.
    pub async fn insert(&self, value: T) -> (Uuid, Arc<T>) {
        self.insert_with(|_| value).await
    }

    /// Insert a value built from its fresh id.
    pub async fn insert_with<F>(&self, build: F) -> (Uuid, Arc<T>)
    where
        F: FnOnce(Uuid) -> T,
    {
        let id = Uuid::new_v4();
        let value = Arc::new(build(id));
        self.entries.write().await.insert(
            id,
            Entry {
                value: value.clone(),
                created: Instant::now(),
            },
        );
        (id, value)
    }

    /// Look up a value that has not expired.
    pub async fn get(&self, id: &Uuid) -> Option<Arc<T>> {
        let entries = self.entries.read().await;
        entries
            .get(id)
            .filter(|e| e.created.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    /// Remove a value.
    pub async fn remove(&self, id: &Uuid) -> Option<Arc<T>> {
        self.entries.write().await.remove(id).map(|e| e.value)
    }

    /// Number of stored values, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop expired values and return them.
    pub async fn evict_expired(&self) -> Vec<Arc<T>> {
        let mut entries = self.entries.write().await;
        let expired: Vec<Uuid> = entries
            .iter()
            .filter(|(_, e)| e.created.elapsed() >= self.ttl)
            .map(|(id, _)| *id)
            .collect();
        expired
            .iter()
            .filter_map(|id| entries.remove(id))
            .map(|e| e.value)
            .collect()
    }
}

// ============================================================================
// Uploads and jobs
// ============================================================================

/// A parsed upload.
pub struct Upload {
    /// The parsed workbook.
    pub workbook: Workbook,
    /// When it arrived.
    pub uploaded_at: DateTime<Utc>,
}

/// Everything a job needs to run.
#[derive(Clone, Debug)]
pub struct JobSpec {
    /// File 1 selection.
    pub file1: SheetSelection,
    /// File 2 selection.
    pub file2: SheetSelection,
    /// Chunking.
    pub options: CompareOptions,
}

/// A comparison job and, once done, its result.
pub struct Job {
    /// Progress and state.
    pub handle: JobHandle,
    /// Notices collected while loading and comparing.
    pub notices: Mutex<Vec<Notice>>,
    /// Set once when the job finishes successfully.
    pub result: OnceLock<Comparison>,
    /// When the job was accepted.
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            handle: JobHandle::new(name),
            notices: Mutex::new(Vec::new()),
            result: OnceLock::new(),
            created_at: Utc::now(),
        }
    }

    /// Copy of the notices so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    fn push_notices(&self, notices: impl IntoIterator<Item = Notice>) {
        if let Ok(mut current) = self.notices.lock() {
            current.extend(notices);
        }
    }

    /// Load both selections and compare them, recording state on the handle.
    ///
    /// Runs on the calling thread; the server calls it from the blocking pool.
    pub fn run(&self, file1: &Workbook, file2: &Workbook, spec: &JobSpec) {
        self.handle.set_state(JobState::Loading);
        let outcome = file1
            .load_selected_sheets(&spec.file1)
            .and_then(|left| {
                self.push_notices(left.notices.iter().cloned());
                let right = file2.load_selected_sheets(&spec.file2)?;
                self.push_notices(right.notices.iter().cloned());
                find_duplicates(&left, &right, &spec.options, &self.handle)
            });

        match outcome {
            Ok(comparison) => {
                self.push_notices(comparison.notices.iter().cloned());
                tracing::info!(
                    job = self.handle.name(),
                    matches = comparison.matches.len(),
                    elapsed_ms = self.handle.elapsed().as_millis() as u64,
                    "Comparison finished"
                );
                let _ = self.result.set(comparison);
                self.handle.set_state(JobState::Done);
            }
            Err(sheetmatch_core::Error::Cancelled) => {
                self.handle.set_state(JobState::Cancelled);
            }
            Err(e) => {
                tracing::warn!(job = self.handle.name(), "Comparison failed: {e}");
                self.handle.set_state(JobState::Failed {
                    reason: e.to_string(),
                });
            }
        }
    }
}

// ============================================================================
// AppState
// ============================================================================

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<SheetmatchConfig>,
    /// Parsed uploads.
    pub uploads: Store<Upload>,
    /// Comparison jobs.
    pub jobs: Store<Job>,
}

impl AppState {
    /// Build empty stores from the configuration.
    pub fn new(config: SheetmatchConfig) -> Self {
        let uploads = Store::new(config.retention.upload_ttl());
        let jobs = Store::new(config.retention.job_ttl());
        Self {
            config: Arc::new(config),
            uploads,
            jobs,
        }
    }

    /// Register a job and start it on the blocking pool.
    pub async fn start_job(
        &self,
        file1: Arc<Upload>,
        file2: Arc<Upload>,
        spec: JobSpec,
    ) -> Uuid {
        let (id, job) = self.jobs.insert_with(|id| Job::new(id.to_string())).await;
        tracing::info!(
            job = %id,
            file1 = file1.workbook.name(),
            file2 = file2.workbook.name(),
            "Starting comparison"
        );

        tokio::task::spawn_blocking(move || {
            job.run(&file1.workbook, &file2.workbook, &spec);
        });
        id
    }

    /// Evict expired uploads and jobs. Running jobs that expire are cancelled.
    pub async fn sweep(&self) -> (usize, usize) {
        let uploads = self.uploads.evict_expired().await.len();
        let jobs = self.jobs.evict_expired().await;
        for job in &jobs {
            job.handle.cancel();
        }
        if uploads > 0 || !jobs.is_empty() {
            tracing::debug!(uploads, jobs = jobs.len(), "Evicted expired entries");
        }
        (uploads, jobs.len())
    }

    /// Spawn the periodic eviction task.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        let period = self.config.retention.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                state.sweep().await;
            }
        })
    }
}
