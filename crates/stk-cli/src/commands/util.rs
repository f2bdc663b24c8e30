//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use stk_core::TimeRange;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Parse a point in time as ISO 8601, a plain date, or a relative phrase.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Plain dates: "2026-01-15" (midnight UTC)
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid time: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z), a date (2026-01-15), or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;
    let minutes_per_unit: i64 = match &caps[2] {
        "minute" => 1,
        "hour" => 60,
        "day" => 60 * 24,
        "week" => 60 * 24 * 7,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    let minutes = n
        .checked_mul(minutes_per_unit)
        .with_context(|| format!("relative time value too large: {n} {}", &caps[2]))?;
    let duration = Duration::try_minutes(minutes)
        .with_context(|| format!("relative time value too large: {n} {}", &caps[2]))?;
    Ok(Utc::now() - duration)
}

/// Resolves the query window from optional bounds.
///
/// Defaults: `to` is now, `from` is seven days before `to`.
pub fn resolve_range(from: Option<&str>, to: Option<&str>) -> anyhow::Result<TimeRange> {
    let end = to.map(parse_datetime).transpose()?.unwrap_or_else(Utc::now);
    let start = from
        .map(parse_datetime)
        .transpose()?
        .unwrap_or_else(|| end - Duration::days(7));
    TimeRange::new(start, end).context("invalid time range")
}

/// Formats seconds as a duration string.
///
/// "Xh Ym" at an hour or more, "Xm" under an hour, "Xs" under a minute.
#[must_use]
pub fn format_duration(secs: i64) -> String {
    if secs < 0 {
        return "0s".to_string();
    }
    if secs < 60 {
        return format!("{secs}s");
    }
    let total_minutes = secs / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
