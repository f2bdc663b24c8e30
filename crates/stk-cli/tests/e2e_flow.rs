//! End-to-end tests for the stk binary over fixture copies of the stores.
//!
//! Covers the full surface: usage aggregation, device resolution, snapshot
//! creation, retention, listing, and export, all against temp-dir fixtures
//! wired in through a config file.

use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

fn stk_binary() -> String {
    env!("CARGO_BIN_EXE_stk").to_string()
}

struct Fixture {
    _temp: TempDir,
    config_file: PathBuf,
    backup_dir: PathBuf,
    event_store: PathBuf,
}

/// Builds an event store, two settings stores (sharing one device
/// identifier), and a config file pointing stk at all of them.
fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let event_store = temp.path().join("knowledgeC.db");
    let settings_dir = temp.path().join("screentime");
    let backup_dir = temp.path().join("backups");
    std::fs::create_dir_all(&settings_dir).unwrap();

    let conn = rusqlite::Connection::open(&event_store).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE ZOBJECT (
            Z_PK INTEGER PRIMARY KEY,
            ZSTREAMNAME TEXT,
            ZSTARTDATE REAL,
            ZENDDATE REAL,
            ZVALUESTRING TEXT,
            ZSOURCE INTEGER
        );
        CREATE TABLE ZSOURCE (Z_PK INTEGER PRIMARY KEY, ZDEVICEID TEXT, ZSOURCEID TEXT);
        -- Two runs of the same app: 120s timed plus a 60s open-ended sample.
        INSERT INTO ZOBJECT (ZSTREAMNAME, ZSTARTDATE, ZENDDATE, ZVALUESTRING, ZSOURCE)
            VALUES ('/app/usage', 0.0, 120.0, 'com.example.App', NULL);
        INSERT INTO ZOBJECT (ZSTREAMNAME, ZSTARTDATE, ZENDDATE, ZVALUESTRING, ZSOURCE)
            VALUES ('/app/usage', 200.0, NULL, 'com.example.App', NULL);
        INSERT INTO ZOBJECT (ZSTREAMNAME, ZSTARTDATE, ZENDDATE, ZVALUESTRING, ZSOURCE)
            VALUES ('/display/isBacklit', 10.0, 20.0, 'ignored', NULL);
        ",
    )
    .unwrap();
    drop(conn);
    // A straggler side file that a snapshot must carry along.
    std::fs::write(temp.path().join("knowledgeC.db-wal"), b"wal bytes").unwrap();

    for (file, name) in [
        ("RMAdminStore-Cloud.sqlite", "Old Name"),
        ("RMAdminStore-Local.sqlite", "New Name"),
    ] {
        let conn = rusqlite::Connection::open(settings_dir.join(file)).unwrap();
        conn.execute_batch(
            "CREATE TABLE ZDEVICE (
                ZIDENTIFIER TEXT PRIMARY KEY, ZNAME TEXT, ZMODEL TEXT, ZLASTSEENDATE REAL
            );",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO ZDEVICE (ZIDENTIFIER, ZNAME, ZMODEL, ZLASTSEENDATE)
             VALUES ('ABC', ?, 'MacBookPro18,1', NULL)",
            [name],
        )
        .unwrap();
    }

    let config_file = temp.path().join("config.toml");
    std::fs::write(
        &config_file,
        format!(
            r#"
[stores]
event_store = "{}"
settings_dir = "{}"

[backup]
enabled = false
interval_hours = 6
retention_days = 30
destination = "{}"

[usage]
default_sample_secs = 60
"#,
            event_store.display(),
            settings_dir.display(),
            backup_dir.display(),
        ),
    )
    .unwrap();

    Fixture {
        _temp: temp,
        config_file,
        backup_dir,
        event_store,
    }
}

fn stk(fixture: &Fixture, args: &[&str]) -> std::process::Output {
    Command::new(stk_binary())
        .arg("--config")
        .arg(&fixture.config_file)
        .args(args)
        .output()
        .expect("failed to run stk")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stk should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

#[test]
fn usage_aggregates_durations_with_the_sample_default() {
    let fixture = fixture();
    let output = stk(
        &fixture,
        &[
            "usage",
            "--from",
            "2001-01-01T00:00:00Z",
            "--to",
            "2001-01-01T00:05:00Z",
            "--json",
        ],
    );

    let records = stdout_json(&output);
    let records = records.as_array().expect("records should be an array");
    assert_eq!(records.len(), 1, "the other stream must be excluded");
    assert_eq!(records[0]["bundle_id"], "com.example.App");
    // 120s timed + 60s default for the open-ended event.
    assert_eq!(records[0]["total_secs"], 180);
    assert_eq!(records[0]["display_name"], "App");
    assert_eq!(records[0]["category"], "other");
}

#[test]
fn usage_respects_a_configured_sample_default() {
    let fixture = fixture();
    let output = Command::new(stk_binary())
        .arg("--config")
        .arg(&fixture.config_file)
        .env("STK_USAGE__DEFAULT_SAMPLE_SECS", "30")
        .args([
            "usage",
            "--from",
            "2001-01-01T00:00:00Z",
            "--to",
            "2001-01-01T00:05:00Z",
            "--json",
        ])
        .output()
        .expect("failed to run stk");

    let records = stdout_json(&output);
    assert_eq!(records[0]["total_secs"], 150);
}

#[test]
fn devices_deduplicate_across_settings_stores() {
    let fixture = fixture();
    let output = stk(&fixture, &["devices", "--json"]);

    let devices = stdout_json(&output);
    let devices = devices.as_array().expect("devices should be an array");
    assert_eq!(devices.len(), 1, "same identifier must collapse to one");
    assert_eq!(devices[0]["identifier"], "ABC");
    // Neither record carries a last-seen, so the later file in name order
    // (RMAdminStore-Local) wins.
    assert_eq!(devices[0]["name"], "New Name");
    assert_eq!(devices[0]["model"], "MacBookPro18,1");
}

#[test]
fn report_buckets_usage_by_category() {
    let fixture = fixture();
    let output = stk(
        &fixture,
        &[
            "report",
            "--hourly",
            "--from",
            "2001-01-01T00:00:00Z",
            "--to",
            "2001-01-01T00:05:00Z",
            "--json",
        ],
    );

    let report = stdout_json(&output);
    let buckets = report["buckets"].as_array().expect("buckets array");
    // All fixture events start within one local hour.
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["category"], "other");
    assert_eq!(buckets[0]["total_secs"], 180);
    assert!(report["timezone"].is_string());
}

#[test]
fn backup_run_snapshots_stores_and_side_files() {
    let fixture = fixture();
    let output = stk(&fixture, &["backup", "run"]);
    assert!(
        output.status.success(),
        "backup should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let snapshots: Vec<PathBuf> = std::fs::read_dir(&fixture.backup_dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0];
    assert!(snapshot.join("knowledgeC.db").exists());
    assert!(snapshot.join("knowledgeC.db-wal").exists());
    assert!(snapshot.join("RMAdminStore-Cloud.sqlite").exists());
    assert!(snapshot.join("RMAdminStore-Local.sqlite").exists());

    // The copy must be byte-identical to the original store.
    assert_eq!(
        std::fs::read(snapshot.join("knowledgeC.db")).unwrap(),
        std::fs::read(&fixture.event_store).unwrap()
    );

    let listing = stk(&fixture, &["backup", "list", "--json"]);
    let listing = stdout_json(&listing);
    assert_eq!(listing.as_array().unwrap().len(), 1);
}

#[test]
fn backup_export_copies_snapshot_contents() {
    let fixture = fixture();
    assert!(stk(&fixture, &["backup", "run"]).status.success());

    let dest = fixture.backup_dir.parent().unwrap().join("exported");
    let output = stk(&fixture, &["backup", "export", dest.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "export should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let exported: Vec<_> = std::fs::read_dir(&dest)
        .unwrap()
        .filter_map(Result::ok)
        .collect();
    assert_eq!(exported.len(), 1);
    assert!(exported[0].path().join("knowledgeC.db").exists());
}

#[test]
fn prune_honors_the_retention_horizon() {
    let fixture = fixture();
    // An expired snapshot, a fresh one, and an in-flight work dir.
    let old = fixture.backup_dir.join("2001-06-01T00-00-00Z");
    let partial = fixture.backup_dir.join("2001-06-02T00-00-00Z.partial");
    std::fs::create_dir_all(&old).unwrap();
    std::fs::create_dir_all(&partial).unwrap();
    assert!(stk(&fixture, &["backup", "run"]).status.success());

    let output = stk(&fixture, &["backup", "prune"]);
    assert!(output.status.success());
    assert!(!old.exists(), "expired snapshot should be deleted");
    assert!(partial.exists(), "in-flight work dir must never be deleted");

    let listing = stk(&fixture, &["backup", "list", "--json"]);
    assert_eq!(stdout_json(&listing).as_array().unwrap().len(), 1);
}

#[test]
fn status_reports_access_against_the_fixture_store() {
    let fixture = fixture();
    let output = stk(&fixture, &["status"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Access: ok"), "unexpected status: {stdout}");
    assert!(stdout.contains("Settings stores: 2"));
}

#[test]
fn unreadable_event_store_fails_usage_with_a_clear_error() {
    let fixture = fixture();
    std::fs::write(&fixture.event_store, b"no longer a database").unwrap();

    let output = stk(
        &fixture,
        &[
            "usage",
            "--from",
            "2001-01-01T00:00:00Z",
            "--to",
            "2001-01-01T00:05:00Z",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("event store"),
        "error should name the store: {stderr}"
    );
}
