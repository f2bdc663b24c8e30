//! Device registry resolution across every discoverable settings store.
//!
//! Resolution order: device tables from all settings stores, then heuristic
//! extraction from the event store, then a synthesized record for the local
//! machine. The result is never empty.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use rusqlite::Connection;
use uuid::Uuid;

use stk_core::{DeviceRecord, epoch};

use crate::paths::StorePaths;
use crate::schema::{
    COL_DEVICE_ID, COL_IDENTIFIER, COL_LAST_SEEN, COL_MODEL, COL_NAME, COL_STREAM_NAME,
    DEVICE_TABLE, EVENT_TABLE, SOURCE_TABLE, table_columns, table_exists,
};
use crate::{StoreError, open_read_only};

/// Stream-name prefix under which some stores embed a device identifier.
const DEVICE_STREAM_PREFIX: &str = "/device/";

/// Resolves the deduplicated device registry.
///
/// Settings stores that cannot be opened or lack a device table are skipped
/// with a warning; they never fail the whole refresh. When no source yields
/// a record, exactly one synthesized record for the local machine is
/// returned, so the result is never empty. Records are sorted by display
/// name, then identifier.
#[must_use]
pub fn fetch_devices(paths: &StorePaths) -> Vec<DeviceRecord> {
    let mut merged: HashMap<String, DeviceRecord> = HashMap::new();

    for file in paths.settings_store_files() {
        match read_device_table(&file) {
            Ok(records) => {
                tracing::debug!(path = %file.display(), count = records.len(), "read device table");
                for record in records {
                    merge_device(&mut merged, record);
                }
            }
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "skipping settings store");
            }
        }
    }

    if merged.is_empty() {
        for record in extract_from_event_store(paths.event_store()) {
            merge_device(&mut merged, record);
        }
    }

    let mut devices: Vec<DeviceRecord> = merged.into_values().collect();
    if devices.is_empty() {
        devices.push(local_device_record());
    }
    devices.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.identifier.cmp(&b.identifier)));
    devices
}

/// Merges one record into the registry keyed by identifier.
///
/// The record with the later `last_seen` wins; with equal or absent
/// timestamps the incoming record wins, which under name-sorted enumeration
/// means the later file. Deterministic either way.
fn merge_device(merged: &mut HashMap<String, DeviceRecord>, incoming: DeviceRecord) {
    match merged.get(&incoming.identifier) {
        Some(existing) if existing.last_seen > incoming.last_seen => {}
        _ => {
            merged.insert(incoming.identifier.clone(), incoming);
        }
    }
}

/// Reads the device table of one settings store.
fn read_device_table(path: &Path) -> Result<Vec<DeviceRecord>, StoreError> {
    let conn = open_read_only(path)?;
    let has_devices =
        table_exists(&conn, DEVICE_TABLE).map_err(|source| StoreError::QueryFailed {
            path: path.to_path_buf(),
            source,
        })?;
    if !has_devices {
        return Err(StoreError::SchemaMismatch {
            path: path.to_path_buf(),
            table: DEVICE_TABLE,
        });
    }

    // Different synced copies carry different column sets; select only what
    // is actually there and let the record fall back to placeholders.
    let columns = table_columns(&conn, DEVICE_TABLE).map_err(|source| StoreError::QueryFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let select = |column: &str| -> String {
        if columns.contains(column) {
            column.to_string()
        } else {
            format!("NULL AS {column}")
        }
    };
    let sql = format!(
        "SELECT {}, {}, {}, {} FROM {DEVICE_TABLE}",
        select(COL_IDENTIFIER),
        select(COL_NAME),
        select(COL_MODEL),
        select(COL_LAST_SEEN),
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|source| StoreError::QueryFailed {
            path: path.to_path_buf(),
            source,
        })?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<f64>>(3)?,
            ))
        })
        .map_err(|source| StoreError::QueryFailed {
            path: path.to_path_buf(),
            source,
        })?;

    let mut records = Vec::new();
    for row in rows {
        let (identifier, name, model, last_seen) =
            row.map_err(|source| StoreError::QueryFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let Some(identifier) = identifier.filter(|id| !id.is_empty()) else {
            // Identifier is the merge key; a row without one cannot be
            // represented and is the only malformed shape we drop.
            tracing::warn!(path = %path.display(), "device row without identifier");
            continue;
        };
        records.push(DeviceRecord::with_placeholders(
            identifier,
            name,
            model,
            last_seen.map(epoch::to_absolute),
        ));
    }
    Ok(records)
}

// ========== Heuristic fallback ==========

/// Best-effort device extraction from the event store.
///
/// This path is inherently fragile and kept separate from the
/// high-confidence device-table path: it first tries the source table's
/// device linkage column, then falls back to parsing identifiers embedded in
/// device-prefixed stream names.
fn extract_from_event_store(path: &Path) -> Vec<DeviceRecord> {
    let conn = match open_read_only(path) {
        Ok(conn) => conn,
        Err(err) => {
            tracing::debug!(error = %err, "event store unavailable for device extraction");
            return Vec::new();
        }
    };

    let from_linkage = linkage_identifiers(&conn);
    let identifiers = if from_linkage.is_empty() {
        stream_name_identifiers(&conn)
    } else {
        from_linkage
    };

    identifiers
        .into_iter()
        .map(|identifier| DeviceRecord::with_placeholders(identifier, None, None, None))
        .collect()
}

/// Distinct device identifiers from the source table, when it has the
/// linkage column.
fn linkage_identifiers(conn: &Connection) -> Vec<String> {
    let has_column = table_columns(conn, SOURCE_TABLE)
        .map(|columns| columns.contains(COL_DEVICE_ID))
        .unwrap_or(false);
    if !has_column {
        return Vec::new();
    }
    let sql = format!(
        "SELECT DISTINCT {COL_DEVICE_ID} FROM {SOURCE_TABLE} \
         WHERE {COL_DEVICE_ID} IS NOT NULL AND {COL_DEVICE_ID} != '' \
         ORDER BY {COL_DEVICE_ID}"
    );
    query_string_column(conn, &sql)
}

/// Device identifiers parsed out of device-prefixed stream names.
fn stream_name_identifiers(conn: &Connection) -> Vec<String> {
    let has_table = table_exists(conn, EVENT_TABLE).unwrap_or(false);
    if !has_table {
        return Vec::new();
    }
    let sql = format!(
        "SELECT DISTINCT {COL_STREAM_NAME} FROM {EVENT_TABLE} \
         WHERE {COL_STREAM_NAME} IS NOT NULL ORDER BY {COL_STREAM_NAME}"
    );
    let mut identifiers: Vec<String> = query_string_column(conn, &sql)
        .iter()
        .filter_map(|name| device_token(name))
        .map(str::to_string)
        .collect();
    identifiers.dedup();
    identifiers
}

/// Extracts a device identifier from a stream name, if the name carries one.
///
/// Accepts only the path segment directly after the device prefix, and only
/// when it has the shape of a unique identifier; anything else is noise.
fn device_token(stream_name: &str) -> Option<&str> {
    let token = stream_name
        .strip_prefix(DEVICE_STREAM_PREFIX)?
        .split('/')
        .next()?;
    Uuid::parse_str(token).is_ok().then_some(token)
}

fn query_string_column(conn: &Connection, sql: &str) -> Vec<String> {
    let Ok(mut stmt) = conn.prepare(sql) else {
        return Vec::new();
    };
    let Ok(rows) = stmt.query_map([], |row| row.get::<_, String>(0)) else {
        return Vec::new();
    };
    rows.filter_map(Result::ok).collect()
}

// ========== Local machine synthesis ==========

/// Synthesizes the record for the machine we are running on.
fn local_device_record() -> DeviceRecord {
    let host = host_name();
    let identifier = hardware_uuid()
        .or_else(|| host.clone())
        .unwrap_or_else(|| "local".to_string());
    DeviceRecord::with_placeholders(identifier, host, None, None)
}

/// The platform hardware identifier, when the platform exposes one.
fn hardware_uuid() -> Option<String> {
    let output = Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_platform_uuid(&String::from_utf8_lossy(&output.stdout))
}

/// Pulls the quoted UUID value out of the platform registry dump.
fn parse_platform_uuid(output: &str) -> Option<String> {
    let line = output.lines().find(|line| line.contains("IOPlatformUUID"))?;
    let value = line.rsplit('"').nth(1)?;
    Uuid::parse_str(value).is_ok().then(|| value.to_string())
}

fn host_name() -> Option<String> {
    hostname::get().ok()?.into_string().ok()
}
