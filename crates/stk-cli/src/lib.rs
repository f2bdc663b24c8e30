//! Screen time keeper CLI library.
//!
//! This crate provides the `stk` command-line interface over the data
//! access and backup engines.

mod cli;
pub mod commands;
mod config;

pub use cli::{BackupAction, Cli, Commands, RangeArgs, ReportArgs};
pub use config::Config;
