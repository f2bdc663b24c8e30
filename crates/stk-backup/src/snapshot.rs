//! Creating timestamped snapshots of the data stores.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use stk_db::StorePaths;

use crate::BackupError;

/// Directory-name format for snapshots: ISO-8601 with `-` in place of `:`
/// so the stamp is valid on every filesystem.
pub const SNAPSHOT_STAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";

/// Suffix of a snapshot directory still being written. Retention and export
/// recognize in-flight work by it and leave it alone.
const PARTIAL_SUFFIX: &str = ".partial";

/// Side files that must travel with a copied store to preserve uncommitted
/// state. Absence means the store was fully checkpointed and is not an
/// error.
const SIDE_FILE_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

/// One completed backup operation. Immutable after creation; destroyed only
/// by retention cleanup.
#[derive(Debug, Clone, Serialize)]
pub struct BackupSnapshot {
    pub created_at: DateTime<Utc>,
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
    pub total_bytes: u64,
}

/// Summary of an existing snapshot directory on disk.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub directory: PathBuf,
    pub total_bytes: u64,
}

/// Formats a snapshot directory name for the given creation time.
#[must_use]
pub fn snapshot_stamp(at: DateTime<Utc>) -> String {
    at.format(SNAPSHOT_STAMP_FORMAT).to_string()
}

/// Parses a snapshot directory name back into its creation time.
///
/// Returns `None` for partial work directories and foreign directories,
/// which makes "unparsable" equivalent to "untouchable" for cleanup.
#[must_use]
pub fn parse_snapshot_stamp(name: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(name, SNAPSHOT_STAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Takes one snapshot of every discoverable store under `root`.
pub fn perform_backup(paths: &StorePaths, root: &Path) -> Result<BackupSnapshot, BackupError> {
    perform_backup_at(paths, root, Utc::now())
}

/// [`perform_backup`] with an explicit creation time, for deterministic
/// tests.
pub fn perform_backup_at(
    paths: &StorePaths,
    root: &Path,
    now: DateTime<Utc>,
) -> Result<BackupSnapshot, BackupError> {
    let sources = source_files(paths);
    if sources.is_empty() {
        return Err(BackupError::NoSources);
    }

    std::fs::create_dir_all(root).map_err(|err| BackupError::io(root, err))?;

    let stamp = snapshot_stamp(now);
    let final_dir = root.join(&stamp);
    let work_dir = root.join(format!("{stamp}{PARTIAL_SUFFIX}"));
    std::fs::create_dir_all(&work_dir).map_err(|err| BackupError::io(&work_dir, err))?;

    let mut copied = Vec::new();
    let mut total_bytes = 0u64;
    for source in sources {
        match copy_store(&source, &work_dir) {
            Ok((files, bytes)) => {
                copied.extend(files);
                total_bytes += bytes;
            }
            Err(err) => {
                // A partial snapshot is not a valid snapshot: abort the
                // remaining copies and leave nothing behind.
                if let Err(cleanup) = std::fs::remove_dir_all(&work_dir) {
                    tracing::warn!(
                        path = %work_dir.display(),
                        error = %cleanup,
                        "failed to remove partial snapshot"
                    );
                }
                return Err(err);
            }
        }
    }

    std::fs::rename(&work_dir, &final_dir).map_err(|err| {
        let _ = std::fs::remove_dir_all(&work_dir);
        BackupError::io(&final_dir, err)
    })?;

    tracing::info!(
        directory = %final_dir.display(),
        files = copied.len(),
        total_bytes,
        "snapshot complete"
    );
    Ok(BackupSnapshot {
        created_at: now,
        directory: final_dir,
        files: copied,
        total_bytes,
    })
}

/// Lists completed snapshots under `root`, oldest first.
#[must_use]
pub fn list_snapshots(root: &Path) -> Vec<SnapshotInfo> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut snapshots: Vec<SnapshotInfo> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let created_at = parse_snapshot_stamp(&name)?;
            let directory = entry.path();
            let total_bytes = directory_size(&directory);
            Some(SnapshotInfo {
                name,
                created_at,
                directory,
                total_bytes,
            })
        })
        .collect();
    snapshots.sort_by_key(|snapshot| snapshot.created_at);
    snapshots
}

/// Every store file that currently exists: the event store plus all
/// enumerated settings store copies.
fn source_files(paths: &StorePaths) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    if paths.event_store().exists() {
        sources.push(paths.event_store().to_path_buf());
    }
    sources.extend(paths.settings_store_files());
    sources
}

/// Copies one store file plus its existing side files into the work
/// directory. Returns the destination paths and bytes written.
fn copy_store(source: &Path, work_dir: &Path) -> Result<(Vec<PathBuf>, u64), BackupError> {
    let mut files = Vec::new();
    let mut bytes = 0u64;

    let mut candidates = vec![source.to_path_buf()];
    for suffix in SIDE_FILE_SUFFIXES {
        let side = side_file(source, suffix);
        if side.exists() {
            candidates.push(side);
        }
    }

    for candidate in candidates {
        let Some(file_name) = candidate.file_name() else {
            continue;
        };
        let destination = work_dir.join(file_name);
        bytes += std::fs::copy(&candidate, &destination)
            .map_err(|err| BackupError::io(&candidate, err))?;
        files.push(destination);
    }
    Ok((files, bytes))
}

/// The side file path for a store: the full file name with the suffix
/// appended (`knowledgeC.db` → `knowledgeC.db-wal`).
fn side_file(store: &Path, suffix: &str) -> PathBuf {
    let mut name = store.file_name().map_or_else(
        || std::ffi::OsString::from(suffix),
        std::ffi::OsStr::to_os_string,
    );
    name.push(suffix);
    store.with_file_name(name)
}

fn directory_size(dir: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.metadata().ok())
        .filter(|metadata| metadata.is_file())
        .map(|metadata| metadata.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixture_paths(root: &Path) -> StorePaths {
        let event_store = root.join("knowledgeC.db");
        let settings_dir = root.join("screentime");
        std::fs::create_dir_all(&settings_dir).unwrap();
        std::fs::write(&event_store, b"event store bytes").unwrap();
        std::fs::write(event_store.with_file_name("knowledgeC.db-wal"), b"wal").unwrap();
        std::fs::write(settings_dir.join("RMAdminStore-Local.sqlite"), b"settings").unwrap();
        StorePaths::new(event_store, settings_dir)
    }

    fn stamp_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, 3, 15, 0).unwrap()
    }

    #[test]
    fn stamp_roundtrips_through_directory_name() {
        let at = stamp_time();
        let name = snapshot_stamp(at);
        assert_eq!(name, "2026-08-08T03-15-00Z");
        assert_eq!(parse_snapshot_stamp(&name), Some(at));
    }

    #[test]
    fn partial_and_foreign_names_do_not_parse() {
        assert!(parse_snapshot_stamp("2026-08-08T03-15-00Z.partial").is_none());
        assert!(parse_snapshot_stamp("exports").is_none());
    }

    #[test]
    fn backup_copies_stores_and_side_files() {
        let temp = tempfile::tempdir().unwrap();
        let paths = fixture_paths(temp.path());
        let root = temp.path().join("backups");

        let snapshot = perform_backup_at(&paths, &root, stamp_time()).unwrap();
        let dir = root.join("2026-08-08T03-15-00Z");
        assert_eq!(snapshot.directory, dir);
        assert!(dir.join("knowledgeC.db").exists());
        assert!(dir.join("knowledgeC.db-wal").exists());
        // No -shm side file existed; its absence is not an error.
        assert!(!dir.join("knowledgeC.db-shm").exists());
        assert!(dir.join("RMAdminStore-Local.sqlite").exists());
        assert_eq!(snapshot.files.len(), 3);
        assert_eq!(
            snapshot.total_bytes,
            ("event store bytes".len() + "wal".len() + "settings".len()) as u64
        );
    }

    #[test]
    fn backup_with_no_discoverable_store_errors() {
        let temp = tempfile::tempdir().unwrap();
        let paths = StorePaths::new(
            temp.path().join("absent.db"),
            temp.path().join("no-settings"),
        );
        let err = perform_backup_at(&paths, &temp.path().join("backups"), stamp_time());
        assert!(matches!(err, Err(BackupError::NoSources)));
    }

    #[test]
    fn failed_copy_leaves_no_snapshot_directory() {
        let temp = tempfile::tempdir().unwrap();
        let event_store = temp.path().join("knowledgeC.db");
        std::fs::write(&event_store, b"bytes").unwrap();
        // A side "file" that is actually a directory makes fs::copy fail
        // partway through the store's candidate list.
        std::fs::create_dir_all(event_store.with_file_name("knowledgeC.db-wal")).unwrap();
        let paths = StorePaths::new(event_store, temp.path().join("no-settings"));

        let root = temp.path().join("backups");
        let err = perform_backup_at(&paths, &root, stamp_time());
        assert!(matches!(err, Err(BackupError::Io { .. })));
        assert!(!root.join("2026-08-08T03-15-00Z").exists());
        assert!(!root.join("2026-08-08T03-15-00Z.partial").exists());
    }

    #[test]
    fn list_snapshots_orders_oldest_first_and_skips_foreign_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("backups");
        for name in [
            "2026-08-08T03-15-00Z",
            "2026-08-07T03-15-00Z",
            "2026-08-09T03-15-00Z.partial",
            "not-a-snapshot",
        ] {
            std::fs::create_dir_all(root.join(name)).unwrap();
        }
        std::fs::write(root.join("2026-08-07T03-15-00Z").join("f"), b"1234").unwrap();

        let snapshots = list_snapshots(&root);
        let names: Vec<&str> = snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["2026-08-07T03-15-00Z", "2026-08-08T03-15-00Z"]);
        assert_eq!(snapshots[0].total_bytes, 4);
    }

    #[test]
    fn side_file_appends_to_full_file_name() {
        let side = side_file(Path::new("/tmp/knowledgeC.db"), "-wal");
        assert_eq!(side, Path::new("/tmp/knowledgeC.db-wal"));
    }
}
