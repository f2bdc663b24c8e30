//! Read-only access to the OS usage data stores.
//!
//! The stores are owned and actively written by the operating system, so
//! every connection here is opened read-only and non-exclusive; this crate
//! never writes to them. Schema differences between synced copies are
//! expected and handled per source file rather than treated as fatal.
//!
//! # Thread Safety
//!
//! Connections are opened per call and dropped before returning, so the
//! public functions are freely callable from any thread.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

pub mod access;
pub mod aggregate;
pub mod devices;
pub mod paths;
mod schema;

pub use access::verify_access;
pub use aggregate::{UsageQuery, fetch_daily_breakdown, fetch_hourly_breakdown, fetch_usage};
pub use devices::fetch_devices;
pub use paths::StorePaths;

/// Errors from the store read path.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store exists but could not be opened; on this platform that
    /// usually means the OS-level access grant is missing.
    #[error("cannot open {path} read-only (access not granted?)")]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The expected store path is absent.
    #[error("data store not found at {path}")]
    SourceNotFound { path: PathBuf },

    /// An expected table is missing from a store.
    #[error("{path} has no {table} table")]
    SchemaMismatch { path: PathBuf, table: &'static str },

    /// A prepared query failed to execute.
    #[error("query against {path} failed")]
    QueryFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

/// Opens a store read-only, distinguishing a missing file from one the
/// process is not allowed to read.
///
/// Read-only and non-exclusive is mandatory: the OS writes these stores
/// while we read them.
pub(crate) fn open_read_only(path: &Path) -> Result<Connection, StoreError> {
    if !path.exists() {
        return Err(StoreError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| StoreError::AccessDenied {
        path: path.to_path_buf(),
        source,
    })
}
