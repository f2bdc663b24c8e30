//! Best-effort export of existing snapshots to an external destination.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::BackupError;
use crate::snapshot::list_snapshots;

/// One file that could not be exported.
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of an export: per-file failures are collected rather than
/// rolling back files already copied.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub snapshots: usize,
    pub files_copied: usize,
    pub failures: Vec<ExportFailure>,
}

/// Copies every completed snapshot directory under `root` into
/// `destination`, preserving the per-snapshot directory layout.
///
/// Only failing to create the destination itself is fatal; individual file
/// failures are reported in the returned [`ExportReport`].
pub fn export_snapshots(root: &Path, destination: &Path) -> Result<ExportReport, BackupError> {
    std::fs::create_dir_all(destination).map_err(|err| BackupError::io(destination, err))?;

    let mut report = ExportReport::default();
    for snapshot in list_snapshots(root) {
        report.snapshots += 1;
        let target_dir = destination.join(&snapshot.name);
        if let Err(err) = std::fs::create_dir_all(&target_dir) {
            tracing::warn!(path = %target_dir.display(), error = %err, "cannot create export dir");
            report.failures.push(ExportFailure {
                path: target_dir,
                error: err.to_string(),
            });
            continue;
        }

        let Ok(entries) = std::fs::read_dir(&snapshot.directory) else {
            report.failures.push(ExportFailure {
                path: snapshot.directory.clone(),
                error: "unreadable snapshot directory".to_string(),
            });
            continue;
        };
        for entry in entries.filter_map(Result::ok) {
            let source = entry.path();
            if !source.is_file() {
                continue;
            }
            let target = target_dir.join(entry.file_name());
            match std::fs::copy(&source, &target) {
                Ok(_) => report.files_copied += 1,
                Err(err) => {
                    tracing::warn!(path = %source.display(), error = %err, "export copy failed");
                    report.failures.push(ExportFailure {
                        path: source,
                        error: err.to_string(),
                    });
                }
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_snapshot(root: &Path, name: &str, files: &[(&str, &[u8])]) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        for (file, bytes) in files {
            std::fs::write(dir.join(file), bytes).unwrap();
        }
    }

    #[test]
    fn exports_every_snapshot_preserving_layout() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("backups");
        seed_snapshot(&root, "2026-08-07T03-15-00Z", &[("knowledgeC.db", b"a")]);
        seed_snapshot(
            &root,
            "2026-08-08T03-15-00Z",
            &[("knowledgeC.db", b"b"), ("knowledgeC.db-wal", b"w")],
        );
        seed_snapshot(&root, "stray-dir", &[("ignored", b"x")]);

        let dest = temp.path().join("exported");
        let report = export_snapshots(&root, &dest).unwrap();
        assert_eq!(report.snapshots, 2);
        assert_eq!(report.files_copied, 3);
        assert!(report.failures.is_empty());
        assert!(dest.join("2026-08-07T03-15-00Z/knowledgeC.db").exists());
        assert!(dest.join("2026-08-08T03-15-00Z/knowledgeC.db-wal").exists());
        assert!(!dest.join("stray-dir").exists());
    }

    #[test]
    fn failed_snapshot_is_reported_without_stopping_the_export() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("backups");
        seed_snapshot(&root, "2026-08-07T03-15-00Z", &[("knowledgeC.db", b"a")]);
        seed_snapshot(&root, "2026-08-08T03-15-00Z", &[("knowledgeC.db", b"b")]);

        // A plain file squatting on one snapshot's target directory makes
        // that snapshot fail while the other still exports.
        let dest = temp.path().join("exported");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("2026-08-08T03-15-00Z"), b"in the way").unwrap();

        let report = export_snapshots(&root, &dest).unwrap();
        assert_eq!(report.snapshots, 2);
        assert_eq!(report.files_copied, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, dest.join("2026-08-08T03-15-00Z"));
        assert!(dest.join("2026-08-07T03-15-00Z/knowledgeC.db").exists());
    }

    #[test]
    fn empty_root_exports_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let report =
            export_snapshots(&temp.path().join("backups"), &temp.path().join("out")).unwrap();
        assert_eq!(report.snapshots, 0);
        assert_eq!(report.files_copied, 0);
    }
}
