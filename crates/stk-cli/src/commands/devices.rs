//! Devices command for listing the resolved device registry.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;

use stk_core::DeviceRecord;
use stk_db::fetch_devices;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    let paths = config
        .store_paths()
        .context("could not determine store locations")?;
    let devices = fetch_devices(&paths);

    if json {
        serde_json::to_writer_pretty(&mut *writer, &devices).context("failed to encode devices")?;
        writeln!(writer)?;
        return Ok(());
    }
    render_table(writer, &devices)
}

fn render_table<W: Write>(writer: &mut W, devices: &[DeviceRecord]) -> Result<()> {
    writeln!(
        writer,
        "{:<38} {:<22} {:<18} LAST SEEN",
        "IDENTIFIER", "NAME", "MODEL"
    )?;
    for device in devices {
        let last_seen = device.last_seen.map_or_else(
            || "never".to_string(),
            |at| at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        writeln!(
            writer,
            "{:<38} {:<22} {:<18} {}",
            device.identifier, device.name, device.model, last_seen
        )?;
    }
    Ok(())
}
