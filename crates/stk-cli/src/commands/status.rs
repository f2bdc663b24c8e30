//! Status command: store locations, access state, and backup inventory.

use std::io::Write;

use anyhow::{Context, Result};

use stk_backup::list_snapshots;
use stk_db::verify_access;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let paths = config
        .store_paths()
        .context("could not determine store locations")?;

    writeln!(writer, "Screen time keeper status")?;
    writeln!(writer, "Event store: {}", paths.event_store().display())?;
    writeln!(
        writer,
        "Settings stores: {}",
        paths.settings_store_files().len()
    )?;

    let access = if verify_access(&paths) {
        "ok"
    } else {
        "unavailable (is Full Disk Access granted?)"
    };
    writeln!(writer, "Access: {access}")?;

    let destination = config.backup_destination();
    let snapshots = list_snapshots(&destination);
    writeln!(
        writer,
        "Snapshots: {} under {}",
        snapshots.len(),
        destination.display()
    )?;
    if let Some(latest) = snapshots.last() {
        writeln!(writer, "Latest snapshot: {}", latest.name)?;
    }
    Ok(())
}
