use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stk_cli::commands::{backup, devices, report, status, usage};
use stk_cli::{BackupAction, Cli, Commands, Config};

/// Load configuration for the invoked command.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout();
    match &cli.command {
        Some(Commands::Status) => {
            let config = load_config(cli.config.as_deref())?;
            status::run(&mut stdout, &config)?;
        }
        Some(Commands::Usage(args)) => {
            let config = load_config(cli.config.as_deref())?;
            usage::run(&mut stdout, &config, args)?;
        }
        Some(Commands::Report(args)) => {
            let config = load_config(cli.config.as_deref())?;
            report::run(&mut stdout, &config, args)?;
        }
        Some(Commands::Devices { json }) => {
            let config = load_config(cli.config.as_deref())?;
            devices::run(&mut stdout, &config, *json)?;
        }
        Some(Commands::Backup { action }) => {
            let config = load_config(cli.config.as_deref())?;
            match action {
                BackupAction::Run => backup::run(&mut stdout, &config).await?,
                BackupAction::Watch => backup::watch(&config).await?,
                BackupAction::List { json } => backup::list(&mut stdout, &config, *json)?,
                BackupAction::Prune => backup::prune(&mut stdout, &config)?,
                BackupAction::Export { destination } => {
                    backup::export(&mut stdout, &config, destination)?;
                }
            }
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
