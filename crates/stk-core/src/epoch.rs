//! Conversion between the stores' reference-date epoch and absolute time.
//!
//! The OS data stores record timestamps as seconds since
//! 2001-01-01T00:00:00 UTC rather than the Unix epoch. Range filters are
//! built from these conversions, so the offset must be bit-exact.

use chrono::{DateTime, Utc};

/// Seconds between 1970-01-01T00:00:00Z and 2001-01-01T00:00:00Z.
pub const REFERENCE_EPOCH_OFFSET_SECS: i64 = 978_307_200;

/// Converts store epoch seconds (REAL column values) to an absolute time.
///
/// Fractional seconds are preserved at nanosecond resolution. Values outside
/// the representable `DateTime<Utc>` range are clamped rather than panicking.
#[must_use]
pub fn to_absolute(epoch_secs: f64) -> DateTime<Utc> {
    let whole = epoch_secs.floor();
    let frac = epoch_secs - whole;
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "whole is floored and frac is in [0, 1)"
    )]
    let nanos = ((frac * 1_000_000_000.0).round() as u32).min(999_999_999);
    #[expect(
        clippy::cast_possible_truncation,
        reason = "out-of-range values are clamped below"
    )]
    let secs = whole as i64;
    DateTime::from_timestamp(secs.saturating_add(REFERENCE_EPOCH_OFFSET_SECS), nanos)
        .unwrap_or_else(|| {
            if secs < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            }
        })
}

/// Converts an absolute time to store epoch seconds.
#[must_use]
pub fn to_epoch(at: DateTime<Utc>) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "store columns are REAL; sub-microsecond drift is below their resolution"
    )]
    let whole = (at.timestamp() - REFERENCE_EPOCH_OFFSET_SECS) as f64;
    whole + f64::from(at.timestamp_subsec_nanos()) / 1_000_000_000.0
}

/// Whole-second variant of [`to_absolute`], used where the fractional part
/// is known to be absent (query bounds, tests).
#[must_use]
pub fn to_absolute_secs(epoch_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch_secs.saturating_add(REFERENCE_EPOCH_OFFSET_SECS), 0)
        .unwrap_or_else(|| {
            if epoch_secs < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            }
        })
}

/// Whole-second variant of [`to_epoch`].
#[must_use]
pub fn to_epoch_secs(at: DateTime<Utc>) -> i64 {
    at.timestamp() - REFERENCE_EPOCH_OFFSET_SECS
}
