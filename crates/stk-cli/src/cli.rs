//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Screen time keeper.
///
/// Preserves the OS usage-tracking stores beyond their rolling retention
/// window by snapshotting them on a schedule, and presents a normalized,
/// categorized view of the recorded usage across synced devices.
#[derive(Debug, Parser)]
#[command(name = "stk", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show store locations, access state, and backup status.
    Status,

    /// Aggregated per-application usage over a time range.
    Usage(RangeArgs),

    /// Hourly or daily category breakdowns.
    Report(ReportArgs),

    /// List devices that have contributed usage data.
    Devices {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage snapshots of the data stores.
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

/// Time-range and filter options shared by the query commands.
#[derive(Debug, Args)]
pub struct RangeArgs {
    /// Range start: ISO 8601, a plain date, or e.g. "2 days ago".
    /// Defaults to 7 days ago.
    #[arg(long)]
    pub from: Option<String>,

    /// Range end, same formats. Defaults to now.
    #[arg(long)]
    pub to: Option<String>,

    /// Only count events linked to this device identifier.
    #[arg(long)]
    pub device: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Breakdown options for the report command.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Bucket by local hour of day.
    #[arg(long, conflicts_with = "daily")]
    pub hourly: bool,

    /// Bucket by local calendar day (the default).
    #[arg(long)]
    pub daily: bool,

    #[command(flatten)]
    pub range: RangeArgs,
}

/// Backup operations.
#[derive(Debug, Subcommand)]
pub enum BackupAction {
    /// Take one snapshot now, then run a retention pass.
    Run,

    /// Run the recurring backup schedule in the foreground.
    Watch,

    /// List existing snapshots.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete snapshots older than the retention horizon.
    Prune,

    /// Copy every snapshot to an external destination (best effort).
    Export {
        /// Destination directory.
        destination: PathBuf,
    },
}
