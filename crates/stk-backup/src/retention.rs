//! Age-based retention over completed snapshots.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::snapshot::parse_snapshot_stamp;

/// How long snapshots are kept. Zero days means unlimited retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    /// Retention horizon in days; 0 disables cleanup entirely.
    pub days: u32,
}

impl RetentionPolicy {
    /// Keep everything forever.
    pub const UNLIMITED: Self = Self { days: 0 };

    #[must_use]
    pub const fn new(days: u32) -> Self {
        Self { days }
    }

    #[must_use]
    pub const fn is_unlimited(self) -> bool {
        self.days == 0
    }
}

/// Outcome of one retention pass. Deletion failures are reported here and
/// logged, never escalated: a failed cleanup must not undo a successful
/// snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    pub examined: usize,
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Runs a retention pass over the snapshot root.
pub fn enforce_retention(root: &Path, policy: RetentionPolicy) -> RetentionReport {
    enforce_retention_at(root, policy, Utc::now())
}

/// [`enforce_retention`] with an explicit "now", for deterministic tests.
///
/// Only directories whose names parse as snapshot stamps are considered;
/// partial work directories and anything foreign never match and are never
/// deleted. A snapshot aged exactly at the horizon is kept; deletion
/// requires strictly older.
pub fn enforce_retention_at(
    root: &Path,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionReport {
    let mut report = RetentionReport::default();
    if policy.is_unlimited() {
        return report;
    }

    let Ok(entries) = std::fs::read_dir(root) else {
        return report;
    };
    let horizon = Duration::days(i64::from(policy.days));

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(created_at) = entry
            .file_name()
            .to_str()
            .and_then(parse_snapshot_stamp)
        else {
            continue;
        };
        report.examined += 1;

        if now - created_at <= horizon {
            continue;
        }
        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "deleted expired snapshot");
                report.deleted.push(path);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to delete snapshot");
                report.failed.push((path, err.to_string()));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::snapshot_stamp;
    use chrono::TimeZone;

    fn make_snapshot(root: &Path, at: DateTime<Utc>) -> PathBuf {
        let dir = root.join(snapshot_stamp(at));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("knowledgeC.db"), b"bytes").unwrap();
        dir
    }

    #[test]
    fn zero_horizon_deletes_nothing_regardless_of_age() {
        let temp = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 0, 0, 0).unwrap();
        let ancient = make_snapshot(temp.path(), now - Duration::days(3650));

        let report = enforce_retention_at(temp.path(), RetentionPolicy::UNLIMITED, now);
        assert!(report.deleted.is_empty());
        assert!(ancient.exists());
    }

    #[test]
    fn deletes_only_strictly_older_than_horizon() {
        let temp = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 0, 0, 0).unwrap();
        let expired = make_snapshot(temp.path(), now - Duration::days(30) - Duration::seconds(1));
        let boundary = make_snapshot(temp.path(), now - Duration::days(30));
        let fresh = make_snapshot(temp.path(), now - Duration::days(1));

        let report = enforce_retention_at(temp.path(), RetentionPolicy::new(30), now);
        assert_eq!(report.examined, 3);
        assert_eq!(report.deleted, vec![expired.clone()]);
        assert!(!expired.exists());
        // Age exactly equal to the horizon stays.
        assert!(boundary.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn in_flight_and_foreign_directories_are_never_deleted() {
        let temp = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 0, 0, 0).unwrap();
        let partial = temp.path().join("2020-01-01T00-00-00Z.partial");
        let foreign = temp.path().join("exports");
        std::fs::create_dir_all(&partial).unwrap();
        std::fs::create_dir_all(&foreign).unwrap();

        let report = enforce_retention_at(temp.path(), RetentionPolicy::new(1), now);
        assert_eq!(report.examined, 0);
        assert!(partial.exists());
        assert!(foreign.exists());
    }

    #[test]
    fn missing_root_is_a_quiet_no_op() {
        let temp = tempfile::tempdir().unwrap();
        let report = enforce_retention_at(
            &temp.path().join("never-created"),
            RetentionPolicy::new(7),
            Utc::now(),
        );
        assert_eq!(report.examined, 0);
        assert!(report.deleted.is_empty());
    }
}
