//! Backup commands: on-demand runs, the foreground schedule, inventory,
//! retention, and export.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use stk_backup::{
    BackupService, BackupStatus, enforce_retention, export_snapshots, list_snapshots,
};

use crate::Config;

fn service_from(config: &Config) -> Result<BackupService> {
    let paths = config
        .store_paths()
        .context("could not determine store locations")?;
    Ok(BackupService::new(paths, config.backup_config()))
}

/// Takes one snapshot now and runs a retention pass.
pub async fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let service = service_from(config)?;
    let snapshot = service
        .run_once()
        .await
        .context("backup did not complete")?;
    writeln!(
        writer,
        "Snapshot {} ({} files, {} bytes)",
        snapshot.directory.display(),
        snapshot.files.len(),
        snapshot.total_bytes
    )?;
    Ok(())
}

/// Runs the recurring schedule in the foreground until interrupted,
/// reporting every status transition.
pub async fn watch(config: &Config) -> Result<()> {
    if !config.backup.enabled {
        anyhow::bail!("automatic backup is disabled; enable it in the configuration first");
    }
    let service = service_from(config)?;
    let mut status_rx = service.subscribe();
    service.reschedule();
    tracing::info!(
        interval_hours = config.backup.interval_hours,
        "watching; interrupt to stop"
    );

    loop {
        status_rx
            .changed()
            .await
            .context("backup service went away")?;
        let status = status_rx.borrow().clone();
        match status {
            BackupStatus::Running { started_at } => {
                tracing::info!(%started_at, "backup started");
            }
            BackupStatus::Idle {
                last_success,
                last_error: None,
            } => {
                tracing::info!(?last_success, "backup finished");
            }
            BackupStatus::Idle {
                last_error: Some(error),
                ..
            } => {
                tracing::warn!(error = %error, "backup failed");
            }
        }
    }
}

/// Lists existing snapshots, oldest first.
pub fn list<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    let destination = config.backup_destination();
    let snapshots = list_snapshots(&destination);

    if json {
        serde_json::to_writer_pretty(&mut *writer, &snapshots)
            .context("failed to encode snapshots")?;
        writeln!(writer)?;
        return Ok(());
    }

    if snapshots.is_empty() {
        writeln!(writer, "No snapshots under {}.", destination.display())?;
        return Ok(());
    }
    writeln!(writer, "{:<22} BYTES", "SNAPSHOT")?;
    for snapshot in &snapshots {
        writeln!(writer, "{:<22} {}", snapshot.name, snapshot.total_bytes)?;
    }
    Ok(())
}

/// Runs a retention pass without taking a snapshot.
pub fn prune<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let policy = config.retention();
    if policy.is_unlimited() {
        writeln!(writer, "Retention is unlimited; nothing to prune.")?;
        return Ok(());
    }
    let report = enforce_retention(&config.backup_destination(), policy);
    writeln!(
        writer,
        "Examined {} snapshots, deleted {}.",
        report.examined,
        report.deleted.len()
    )?;
    for (path, error) in &report.failed {
        writeln!(writer, "Failed to delete {}: {error}", path.display())?;
    }
    Ok(())
}

/// Copies every snapshot to an external destination, best effort.
pub fn export<W: Write>(writer: &mut W, config: &Config, destination: &Path) -> Result<()> {
    let report = export_snapshots(&config.backup_destination(), destination)
        .context("export destination is unusable")?;
    writeln!(
        writer,
        "Exported {} snapshots ({} files) to {}",
        report.snapshots,
        report.files_copied,
        destination.display()
    )?;
    for failure in &report.failures {
        writeln!(
            writer,
            "Failed to copy {}: {}",
            failure.path.display(),
            failure.error
        )?;
    }
    if !report.failures.is_empty() {
        anyhow::bail!("{} files failed to export", report.failures.len());
    }
    Ok(())
}
