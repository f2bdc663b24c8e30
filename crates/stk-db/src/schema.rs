//! Table, column, and stream-name constants for the OS stores, plus the
//! introspection helpers used to tolerate schema drift between synced copies.

use std::collections::HashSet;

use rusqlite::Connection;

/// Primary event table in the event store.
pub const EVENT_TABLE: &str = "ZOBJECT";
pub const COL_STREAM_NAME: &str = "ZSTREAMNAME";
pub const COL_START_DATE: &str = "ZSTARTDATE";
pub const COL_END_DATE: &str = "ZENDDATE";
pub const COL_VALUE_STRING: &str = "ZVALUESTRING";
pub const COL_SOURCE_FK: &str = "ZSOURCE";

/// Source table joined for device linkage; either linkage column may be
/// present depending on which device wrote the store.
pub const SOURCE_TABLE: &str = "ZSOURCE";
pub const COL_DEVICE_ID: &str = "ZDEVICEID";
pub const COL_SOURCE_ID: &str = "ZSOURCEID";

/// Device table in the settings stores.
pub const DEVICE_TABLE: &str = "ZDEVICE";
pub const COL_IDENTIFIER: &str = "ZIDENTIFIER";
pub const COL_NAME: &str = "ZNAME";
pub const COL_MODEL: &str = "ZMODEL";
pub const COL_LAST_SEEN: &str = "ZLASTSEENDATE";

/// Stream names carrying application usage events.
pub const STREAM_APP_USAGE: &str = "/app/usage";
pub const STREAM_APP_IN_FOCUS: &str = "/app/inFocus";

/// Whether a table exists in the connected store.
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Column names of a table, empty when the table is absent.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut columns = HashSet::new();
    for row in rows {
        columns.insert(row?);
    }
    Ok(columns)
}
