//! Normalized usage records and the aggregation policies behind them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::category::UsageCategory;

/// Validation errors for usage types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// The range end precedes its start.
    #[error("range end {end} precedes start {start}")]
    InvertedRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// An inclusive query window over absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range, rejecting inverted bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, UsageError> {
        if end < start {
            return Err(UsageError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether the instant falls within the range (inclusive of both ends).
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Default duration credited to an event that has no end time.
///
/// Events without an end time are single-sample observations, not
/// zero-length ones; the 60-second credit is an explicit policy choice
/// inherited from the source system, not a measurement.
pub const DEFAULT_SAMPLE_SECS: i64 = 60;

/// The missing-end-time duration policy, carried as a value so callers can
/// adjust it through configuration rather than recompiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SamplePolicy {
    /// Seconds credited to an event with no end time.
    pub default_sample_secs: i64,
}

impl Default for SamplePolicy {
    fn default() -> Self {
        Self {
            default_sample_secs: DEFAULT_SAMPLE_SECS,
        }
    }
}

/// One observed run of an application, aggregated over a query window.
///
/// Immutable once constructed. There is one record per unique bundle
/// identifier within a window; durations of all matching raw events are
/// summed into `total_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    /// Stable application identifier (bundle ID).
    pub bundle_id: String,
    /// Best-effort human-readable name derived from the identifier.
    pub display_name: String,
    /// Total observed duration in seconds, never negative.
    pub total_secs: i64,
    /// Start of the originating query window.
    pub range_start: DateTime<Utc>,
    /// End of the originating query window.
    pub range_end: DateTime<Utc>,
    /// Owning device, when the query was device-filtered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Assigned usage category.
    pub category: UsageCategory,
}

/// One (hour-of-day, category) cell of the hourly breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyBucket {
    /// Local-calendar hour of day, 0–23.
    pub hour: u32,
    pub category: UsageCategory,
    pub total_secs: i64,
}

/// One (calendar day, category) cell of the daily breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    /// Local calendar day.
    pub day: NaiveDate,
    pub category: UsageCategory,
    pub total_secs: i64,
}

/// Derives a display name from a bundle identifier.
///
/// Takes the final dot-separated segment and upper-cases its first letter;
/// identifiers without a usable segment fall back to the identifier itself.
#[must_use]
pub fn display_name_for(bundle_id: &str) -> String {
    let segment = bundle_id.rsplit('.').next().unwrap_or(bundle_id).trim();
    if segment.is_empty() {
        return bundle_id.to_string();
    }
    let mut chars = segment.chars();
    chars.next().map_or_else(
        || bundle_id.to_string(),
        |first| first.to_uppercase().collect::<String>() + chars.as_str(),
    )
}
