//! Device records discovered across synced settings stores.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Fallback display name for a device record missing one.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

/// Fallback model string for a device record missing one.
pub const UNKNOWN_MODEL: &str = "Unknown";

/// A distinct device that has contributed usage data.
///
/// Identity is `identifier`: records from different source files sharing an
/// identifier are the same logical device and collapse to one entry during
/// registry resolution. Records are constructed transiently on every refresh
/// and never persisted by this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    /// Unique identifier, the primary key across all discovered sources.
    pub identifier: String,
    /// Display name, falling back to [`UNKNOWN_DEVICE_NAME`].
    pub name: String,
    /// Model or device class, falling back to [`UNKNOWN_MODEL`].
    pub model: String,
    /// When the device was last observed, if any source recorded it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    /// Builds a record, substituting the fixed placeholders for missing
    /// optional fields. Malformed rows are normalized here rather than
    /// dropped.
    #[must_use]
    pub fn with_placeholders(
        identifier: String,
        name: Option<String>,
        model: Option<String>,
        last_seen: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            identifier,
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string()),
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            last_seen,
        }
    }
}
