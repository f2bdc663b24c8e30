//! Usage command: aggregated per-application durations over a range.

use std::io::Write;

use anyhow::{Context, Result};

use stk_db::{StorePaths, UsageQuery, fetch_usage};
use stk_core::UsageRecord;

use crate::Config;
use crate::cli::RangeArgs;
use crate::commands::util::{format_duration, resolve_range};

pub fn run<W: Write>(writer: &mut W, config: &Config, args: &RangeArgs) -> Result<()> {
    let paths = config
        .store_paths()
        .context("could not determine store locations")?;
    let records = query_usage(&paths, config, args)?;

    if args.json {
        serde_json::to_writer_pretty(&mut *writer, &records).context("failed to encode usage")?;
        writeln!(writer)?;
        return Ok(());
    }
    render_table(writer, &records)
}

fn query_usage(paths: &StorePaths, config: &Config, args: &RangeArgs) -> Result<Vec<UsageRecord>> {
    let range = resolve_range(args.from.as_deref(), args.to.as_deref())?;
    let query = UsageQuery {
        range,
        device: args.device.clone(),
        policy: config.sample_policy(),
    };
    fetch_usage(paths, &query).context("failed to read the event store")
}

fn render_table<W: Write>(writer: &mut W, records: &[UsageRecord]) -> Result<()> {
    if records.is_empty() {
        writeln!(writer, "No usage events in range.")?;
        return Ok(());
    }
    writeln!(
        writer,
        "{:<10} {:<24} {:<14} APP",
        "DURATION", "NAME", "CATEGORY"
    )?;
    for record in records {
        writeln!(
            writer,
            "{:<10} {:<24} {:<14} {}",
            format_duration(record.total_secs),
            record.display_name,
            record.category.as_str(),
            record.bundle_id,
        )?;
    }
    Ok(())
}
