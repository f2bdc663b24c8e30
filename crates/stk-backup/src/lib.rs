//! Snapshotting of the OS data stores and retention over the snapshots.
//!
//! The write path never touches the original stores beyond reading them:
//! snapshots are plain file copies (primary store plus any `-wal`/`-shm`
//! side files) into a timestamped directory per run. The [`BackupService`]
//! guarantees at most one snapshot operation in flight and owns the
//! recurring schedule.

use std::path::PathBuf;

use thiserror::Error;

pub mod export;
pub mod retention;
pub mod service;
pub mod snapshot;

pub use export::{ExportFailure, ExportReport, export_snapshots};
pub use retention::{RetentionPolicy, RetentionReport, enforce_retention};
pub use service::{BackupConfig, BackupService, BackupStatus};
pub use snapshot::{BackupSnapshot, SnapshotInfo, list_snapshots, perform_backup};

/// Errors from the backup write path.
#[derive(Debug, Error)]
pub enum BackupError {
    /// A snapshot operation is already in flight; the request is rejected,
    /// not queued.
    #[error("backup already in progress")]
    AlreadyRunning,

    /// No data store could be discovered to copy.
    #[error("no data stores found to back up")]
    NoSources,

    /// A copy or directory operation failed; the snapshot is aborted and
    /// its partial directory removed.
    #[error("backup I/O failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking copy task died before reporting a result.
    #[error("backup task failed: {0}")]
    Task(String),
}

impl BackupError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
