//! The backup orchestrator: single-flight runs, status publication, and the
//! recurring schedule.
//!
//! One service instance is constructed at process start and handed to every
//! consumer; there is no hidden global. Status changes are published on a
//! `watch` channel so callers can observe transitions without polling and
//! without any UI binding.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use stk_db::StorePaths;

use crate::retention::{RetentionPolicy, enforce_retention};
use crate::snapshot::{BackupSnapshot, perform_backup};
use crate::BackupError;

/// Lock file guarding the backup root against a second process.
const LOCK_FILE: &str = ".stk-backup.lock";

/// User-facing backup configuration.
#[derive(Debug, Clone, Serialize)]
pub struct BackupConfig {
    /// Whether the recurring schedule is armed.
    pub enabled: bool,
    /// Hours between scheduled runs; clamped to at least one.
    pub interval_hours: u64,
    /// Snapshot retention horizon.
    pub retention: RetentionPolicy,
    /// Snapshot root directory.
    pub destination: PathBuf,
}

impl BackupConfig {
    fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_hours.max(1).saturating_mul(3600))
    }
}

/// Observable orchestrator state.
///
/// There is at most one `Running` system-wide; a failed run returns to
/// `Idle` with the error retained until the next run replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BackupStatus {
    Idle {
        last_success: Option<DateTime<Utc>>,
        last_error: Option<String>,
    },
    Running {
        started_at: DateTime<Utc>,
    },
}

/// Orchestrates snapshot runs over a fixed set of store paths.
#[derive(Clone)]
pub struct BackupService {
    inner: Arc<Inner>,
}

struct Inner {
    paths: StorePaths,
    config: Mutex<BackupConfig>,
    running: AtomicBool,
    last_success: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
    status_tx: watch::Sender<BackupStatus>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl BackupService {
    #[must_use]
    pub fn new(paths: StorePaths, config: BackupConfig) -> Self {
        let (status_tx, _) = watch::channel(BackupStatus::Idle {
            last_success: None,
            last_error: None,
        });
        Self {
            inner: Arc::new(Inner {
                paths,
                config: Mutex::new(config),
                running: AtomicBool::new(false),
                last_success: Mutex::new(None),
                last_error: Mutex::new(None),
                status_tx,
                timer: Mutex::new(None),
            }),
        }
    }

    /// Subscribes to status transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BackupStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> BackupStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> BackupConfig {
        lock(&self.inner.config).clone()
    }

    /// Replaces the configuration and re-arms (or disarms) the schedule to
    /// match. Cancel-then-recreate happens under one lock so two timers can
    /// never coexist.
    pub fn update_config(&self, config: BackupConfig) {
        *lock(&self.inner.config) = config;
        self.reschedule();
    }

    /// Performs one snapshot run followed by a retention pass.
    ///
    /// Rejects with [`BackupError::AlreadyRunning`] when a run is in flight,
    /// in this process (atomic guard) or another (lock file in the backup
    /// root). Last-success time is recorded only on full completion.
    pub async fn run_once(&self) -> Result<BackupSnapshot, BackupError> {
        let guard = RunGuard::acquire(&self.inner.running)?;
        self.inner.status_tx.send_replace(BackupStatus::Running {
            started_at: Utc::now(),
        });

        let paths = self.inner.paths.clone();
        let (destination, retention) = {
            let config = lock(&self.inner.config);
            (config.destination.clone(), config.retention)
        };

        let result = tokio::task::spawn_blocking(move || {
            let _process_lock = acquire_process_lock(&destination)?;
            let snapshot = perform_backup(&paths, &destination)?;
            // Retention runs strictly after the snapshot completes, never
            // interleaved with its creation.
            let report = enforce_retention(&destination, retention);
            if !report.failed.is_empty() {
                tracing::warn!(failed = report.failed.len(), "retention pass reported failures");
            }
            Ok(snapshot)
        })
        .await
        .map_err(|err| BackupError::Task(err.to_string()))
        .and_then(std::convert::identity);

        match &result {
            Ok(snapshot) => {
                *lock(&self.inner.last_success) = Some(snapshot.created_at);
                *lock(&self.inner.last_error) = None;
            }
            Err(err) => {
                *lock(&self.inner.last_error) = Some(err.to_string());
            }
        }
        drop(guard);
        self.inner.status_tx.send_replace(BackupStatus::Idle {
            last_success: *lock(&self.inner.last_success),
            last_error: lock(&self.inner.last_error).clone(),
        });
        result
    }

    /// Re-arms the recurring schedule from the current configuration.
    ///
    /// Any existing timer is cancelled first; when the schedule is disabled
    /// no new one is created. Must be called from within a tokio runtime.
    pub fn reschedule(&self) {
        let mut timer = lock(&self.inner.timer);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        let config = self.config();
        if !config.enabled {
            tracing::info!("backup schedule disabled");
            return;
        }
        let period = config.interval();
        tracing::info!(interval_hours = config.interval_hours, "backup schedule armed");
        let service = self.clone();
        *timer = Some(tokio::spawn(schedule_loop(service, period)));
    }

    #[cfg(test)]
    fn timer_is_armed(&self) -> bool {
        lock(&self.inner.timer).is_some()
    }
}

/// The recurring timer body: wait one period, run, repeat. Re-arming is done
/// by replacing this task entirely, never by stacking a second one.
async fn schedule_loop(service: BackupService, period: std::time::Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the first run
    // happens one full period after arming.
    interval.tick().await;
    loop {
        interval.tick().await;
        match service.run_once().await {
            Ok(snapshot) => {
                tracing::info!(directory = %snapshot.directory.display(), "scheduled backup complete");
            }
            Err(BackupError::AlreadyRunning) => {
                tracing::debug!("scheduled backup skipped; another run is in flight");
            }
            Err(err) => {
                tracing::warn!(error = %err, "scheduled backup failed");
            }
        }
    }
}

/// In-process single-flight guard; releases the flag on drop.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, BackupError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Ok(Self { flag })
        } else {
            Err(BackupError::AlreadyRunning)
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Cross-process guard: an advisory exclusive lock on a file in the backup
/// root, held for the duration of the copy + retention work.
fn acquire_process_lock(root: &Path) -> Result<std::fs::File, BackupError> {
    std::fs::create_dir_all(root).map_err(|err| BackupError::io(root, err))?;
    let path = root.join(LOCK_FILE);
    let file = std::fs::File::create(&path).map_err(|err| BackupError::io(&path, err))?;
    file.try_lock_exclusive()
        .map_err(|_| BackupError::AlreadyRunning)?;
    Ok(file)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
