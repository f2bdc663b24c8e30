//! Report command: hourly and daily category breakdowns.
//!
//! Rows are emitted in chronological bucket order with the fixed category
//! display order inside each bucket, matching what a stacked rendering
//! needs; buckets without events are omitted.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use stk_core::{DailyBucket, HourlyBucket};
use stk_db::{UsageQuery, fetch_daily_breakdown, fetch_hourly_breakdown};

use crate::Config;
use crate::cli::ReportArgs;
use crate::commands::util::{format_duration, resolve_range};

/// JSON envelope for breakdown output.
#[derive(Debug, Serialize)]
struct BreakdownReport<T: Serialize> {
    timezone: String,
    buckets: Vec<T>,
}

pub fn run<W: Write>(writer: &mut W, config: &Config, args: &ReportArgs) -> Result<()> {
    let paths = config
        .store_paths()
        .context("could not determine store locations")?;
    let range = resolve_range(args.range.from.as_deref(), args.range.to.as_deref())?;
    let query = UsageQuery {
        range,
        device: args.range.device.clone(),
        policy: config.sample_policy(),
    };
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    if args.hourly {
        let buckets =
            fetch_hourly_breakdown(&paths, &query).context("failed to read the event store")?;
        if args.range.json {
            write_json(writer, timezone, buckets)?;
        } else {
            render_hourly(writer, &timezone, &buckets)?;
        }
    } else {
        let buckets =
            fetch_daily_breakdown(&paths, &query).context("failed to read the event store")?;
        if args.range.json {
            write_json(writer, timezone, buckets)?;
        } else {
            render_daily(writer, &timezone, &buckets)?;
        }
    }
    Ok(())
}

fn write_json<W: Write, T: Serialize>(
    writer: &mut W,
    timezone: String,
    buckets: Vec<T>,
) -> Result<()> {
    let report = BreakdownReport { timezone, buckets };
    serde_json::to_writer_pretty(&mut *writer, &report).context("failed to encode report")?;
    writeln!(writer)?;
    Ok(())
}

fn render_hourly<W: Write>(
    writer: &mut W,
    timezone: &str,
    buckets: &[HourlyBucket],
) -> Result<()> {
    if buckets.is_empty() {
        writeln!(writer, "No usage events in range.")?;
        return Ok(());
    }
    writeln!(writer, "Hourly usage ({timezone})")?;
    for bucket in buckets {
        writeln!(
            writer,
            "{:02}:00  {:<14} {}",
            bucket.hour,
            bucket.category.as_str(),
            format_duration(bucket.total_secs),
        )?;
    }
    Ok(())
}

fn render_daily<W: Write>(writer: &mut W, timezone: &str, buckets: &[DailyBucket]) -> Result<()> {
    if buckets.is_empty() {
        writeln!(writer, "No usage events in range.")?;
        return Ok(());
    }
    writeln!(writer, "Daily usage ({timezone})")?;
    for bucket in buckets {
        writeln!(
            writer,
            "{}  {:<14} {}",
            bucket.day,
            bucket.category.as_str(),
            format_duration(bucket.total_secs),
        )?;
    }
    Ok(())
}
