//! Verifying that the event store is actually readable.
//!
//! On this platform a store file can exist yet be unreadable until the user
//! grants the process Full Disk Access, so existence alone never counts:
//! access is proven by opening read-only and executing a trivial query.

use std::path::Path;

use crate::{StoreError, open_read_only};

/// Checks that the primary event store can be opened and queried.
pub fn check_event_store(path: &Path) -> Result<(), StoreError> {
    let conn = open_read_only(path)?;
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|source| StoreError::QueryFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Boolean form of [`check_event_store`] for callers that only branch.
#[must_use]
pub fn verify_access(paths: &crate::StorePaths) -> bool {
    match check_event_store(paths.event_store()) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %err, "event store access check failed");
            false
        }
    }
}
