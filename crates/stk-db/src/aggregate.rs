//! Range-filtered aggregation of raw usage events.
//!
//! Raw rows come from the event store's usage and in-focus streams. Each row
//! carries a start time and an optional end time in store epoch seconds; rows
//! without an end time are single-sample observations credited with the
//! configured default duration. Aggregation collapses rows to one record per
//! bundle identifier, and the breakdown variants bucket by the event's own
//! start time in local calendar terms.

use std::collections::BTreeMap;

use chrono::{Local, TimeZone, Timelike};
use rusqlite::{Connection, params_from_iter, types::Value};

use stk_core::{
    DailyBucket, HourlyBucket, SamplePolicy, TimeRange, UsageCategory, UsageRecord, categorize,
    display_name_for, epoch,
};

use crate::paths::StorePaths;
use crate::schema::{
    COL_DEVICE_ID, COL_END_DATE, COL_SOURCE_FK, COL_SOURCE_ID, COL_START_DATE, COL_STREAM_NAME,
    COL_VALUE_STRING, EVENT_TABLE, SOURCE_TABLE, STREAM_APP_IN_FOCUS, STREAM_APP_USAGE,
    table_columns, table_exists,
};
use crate::{StoreError, open_read_only};

/// Parameters of one aggregation request.
#[derive(Debug, Clone)]
pub struct UsageQuery {
    /// Inclusive window filtering event start times.
    pub range: TimeRange,
    /// Restrict to events linked to this device identifier.
    pub device: Option<String>,
    /// Missing-end-time duration policy.
    pub policy: SamplePolicy,
}

impl UsageQuery {
    /// A query over the given range with no device filter and the default
    /// sample policy.
    #[must_use]
    pub fn over(range: TimeRange) -> Self {
        Self {
            range,
            device: None,
            policy: SamplePolicy::default(),
        }
    }
}

/// A raw event row after stream and range filtering.
#[derive(Debug, Clone)]
struct RawEvent {
    bundle_id: String,
    start: f64,
    end: Option<f64>,
}

/// Fetches per-application usage aggregated over the query window.
///
/// Returns one [`UsageRecord`] per unique bundle identifier, ordered by
/// total duration descending with identifier as the deterministic tie-break.
pub fn fetch_usage(paths: &StorePaths, query: &UsageQuery) -> Result<Vec<UsageRecord>, StoreError> {
    let events = load_raw_events(paths, query)?;

    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    for event in events {
        let secs = event_duration_secs(event.start, event.end, query.policy);
        *totals.entry(event.bundle_id).or_insert(0) += secs;
    }

    let mut records: Vec<UsageRecord> = totals
        .into_iter()
        .map(|(bundle_id, total_secs)| UsageRecord {
            display_name: display_name_for(&bundle_id),
            category: categorize(&bundle_id),
            total_secs,
            range_start: query.range.start,
            range_end: query.range.end,
            device_id: query.device.clone(),
            bundle_id,
        })
        .collect();
    records.sort_by(|a, b| {
        b.total_secs
            .cmp(&a.total_secs)
            .then_with(|| a.bundle_id.cmp(&b.bundle_id))
    });
    Ok(records)
}

/// Per-hour, per-category breakdown in the local calendar.
pub fn fetch_hourly_breakdown(
    paths: &StorePaths,
    query: &UsageQuery,
) -> Result<Vec<HourlyBucket>, StoreError> {
    fetch_hourly_breakdown_in(paths, query, &Local)
}

/// [`fetch_hourly_breakdown`] with an explicit timezone, for deterministic
/// tests.
pub fn fetch_hourly_breakdown_in<Tz: TimeZone>(
    paths: &StorePaths,
    query: &UsageQuery,
    tz: &Tz,
) -> Result<Vec<HourlyBucket>, StoreError> {
    let events = load_raw_events(paths, query)?;

    // Keyed by (hour, display rank) so iteration yields chronological bucket
    // order with the fixed category order inside each bucket.
    let mut cells: BTreeMap<(u32, usize), i64> = BTreeMap::new();
    for event in events {
        let local = epoch::to_absolute(event.start).with_timezone(tz);
        let category = categorize(&event.bundle_id);
        let secs = event_duration_secs(event.start, event.end, query.policy);
        *cells
            .entry((local.hour(), category.display_rank()))
            .or_insert(0) += secs;
    }

    Ok(cells
        .into_iter()
        .map(|((hour, rank), total_secs)| HourlyBucket {
            hour,
            category: UsageCategory::DISPLAY_ORDER[rank],
            total_secs,
        })
        .collect())
}

/// Per-day, per-category breakdown in the local calendar.
pub fn fetch_daily_breakdown(
    paths: &StorePaths,
    query: &UsageQuery,
) -> Result<Vec<DailyBucket>, StoreError> {
    fetch_daily_breakdown_in(paths, query, &Local)
}

/// [`fetch_daily_breakdown`] with an explicit timezone, for deterministic
/// tests.
pub fn fetch_daily_breakdown_in<Tz: TimeZone>(
    paths: &StorePaths,
    query: &UsageQuery,
    tz: &Tz,
) -> Result<Vec<DailyBucket>, StoreError> {
    let events = load_raw_events(paths, query)?;

    let mut cells: BTreeMap<(chrono::NaiveDate, usize), i64> = BTreeMap::new();
    for event in events {
        let local = epoch::to_absolute(event.start).with_timezone(tz);
        let category = categorize(&event.bundle_id);
        let secs = event_duration_secs(event.start, event.end, query.policy);
        *cells
            .entry((local.date_naive(), category.display_rank()))
            .or_insert(0) += secs;
    }

    Ok(cells
        .into_iter()
        .map(|((day, rank), total_secs)| DailyBucket {
            day,
            category: UsageCategory::DISPLAY_ORDER[rank],
            total_secs,
        })
        .collect())
}

/// Duration credited to a single raw event.
fn event_duration_secs(start: f64, end: Option<f64>, policy: SamplePolicy) -> i64 {
    match end {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "store durations are bounded well below i64 seconds"
        )]
        Some(end) if end > start => (end - start).round() as i64,
        // An end at or before the start credits nothing; only a missing end
        // triggers the sample default.
        Some(_) => 0,
        None => policy.default_sample_secs,
    }
}

/// Loads the filtered raw rows from the event store.
fn load_raw_events(paths: &StorePaths, query: &UsageQuery) -> Result<Vec<RawEvent>, StoreError> {
    let path = paths.event_store();
    let conn = open_read_only(path)?;

    let has_events = table_exists(&conn, EVENT_TABLE).map_err(|source| StoreError::QueryFailed {
        path: path.to_path_buf(),
        source,
    })?;
    if !has_events {
        return Err(StoreError::SchemaMismatch {
            path: path.to_path_buf(),
            table: EVENT_TABLE,
        });
    }

    let mut sql = format!(
        "SELECT o.{COL_VALUE_STRING}, o.{COL_START_DATE}, o.{COL_END_DATE} FROM {EVENT_TABLE} o"
    );
    let mut params: Vec<Value> = Vec::new();

    let linkage = if query.device.is_some() {
        let columns = device_linkage_columns(&conn, path)?;
        if columns.is_empty() {
            // No way to express the filter against this store's schema;
            // a device-filtered query over it matches nothing.
            tracing::warn!(
                path = %path.display(),
                "store has no device linkage columns; device filter matches no events"
            );
            return Ok(Vec::new());
        }
        sql.push_str(&format!(
            " LEFT JOIN {SOURCE_TABLE} s ON o.{COL_SOURCE_FK} = s.Z_PK"
        ));
        columns
    } else {
        Vec::new()
    };

    sql.push_str(&format!(
        " WHERE o.{COL_STREAM_NAME} IN (?, ?) \
          AND o.{COL_VALUE_STRING} IS NOT NULL \
          AND o.{COL_START_DATE} IS NOT NULL \
          AND o.{COL_START_DATE} >= ? AND o.{COL_START_DATE} <= ?"
    ));
    params.push(Value::Text(STREAM_APP_USAGE.to_string()));
    params.push(Value::Text(STREAM_APP_IN_FOCUS.to_string()));
    params.push(Value::Real(epoch::to_epoch(query.range.start)));
    params.push(Value::Real(epoch::to_epoch(query.range.end)));

    if let Some(device) = &query.device {
        let predicates: Vec<String> = linkage
            .iter()
            .map(|column| format!("s.{column} = ?"))
            .collect();
        sql.push_str(&format!(" AND ({})", predicates.join(" OR ")));
        for _ in &linkage {
            params.push(Value::Text(device.clone()));
        }
    }

    sql.push_str(&format!(" ORDER BY o.{COL_START_DATE} ASC"));

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|source| StoreError::QueryFailed {
            path: path.to_path_buf(),
            source,
        })?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| {
            Ok(RawEvent {
                bundle_id: row.get(0)?,
                start: row.get(1)?,
                end: row.get(2)?,
            })
        })
        .map_err(|source| StoreError::QueryFailed {
            path: path.to_path_buf(),
            source,
        })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row.map_err(|source| StoreError::QueryFailed {
            path: path.to_path_buf(),
            source,
        })?);
    }
    tracing::debug!(count = events.len(), "loaded raw usage events");
    Ok(events)
}

/// Device linkage columns actually present on the source table.
fn device_linkage_columns(
    conn: &Connection,
    path: &std::path::Path,
) -> Result<Vec<&'static str>, StoreError> {
    let has_source = table_exists(conn, SOURCE_TABLE).map_err(|source| StoreError::QueryFailed {
        path: path.to_path_buf(),
        source,
    })?;
    if !has_source {
        return Ok(Vec::new());
    }
    let columns = table_columns(conn, SOURCE_TABLE).map_err(|source| StoreError::QueryFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok([COL_DEVICE_ID, COL_SOURCE_ID]
        .into_iter()
        .filter(|column| columns.contains(*column))
        .collect())
}
