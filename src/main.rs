//! soilmon CLI
//!
//! Usage:
//!   soilmon dashboard --region MADRID        Show the dashboard for a region
//!   soilmon regions --location Madrid        List selectable regions
//!   soilmon import-historical --dir DATA     Import AEMET annual statistics
//!   soilmon simulate -n 10                   Write simulated readings
//!   soilmon sync-stations                    Rebuild the province station map

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;

use soilmon_service::config::Config;
use soilmon_service::logging;

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Priority: RUST_LOG env var > --verbose flag > config level
    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    logging::init(level, config.logging.file.as_deref()).context("Failed to open log file")?;

    match cli.command {
        Commands::Dashboard {
            region,
            username,
            location,
            date,
            simulate,
            charts,
            json,
        } => commands::cmd_dashboard(
            &config,
            commands::DashboardArgs {
                region,
                username,
                location,
                date,
                simulate,
                charts,
                json,
            },
        ),
        Commands::Regions { location } => commands::cmd_regions(&config, location),
        Commands::ImportHistorical { dir, dry_run } => {
            commands::cmd_import_historical(&config, &dir, dry_run)
        }
        Commands::Simulate {
            count,
            interval_secs,
        } => commands::cmd_simulate(&config, count, interval_secs),
        Commands::SyncStations { dry_run } => commands::cmd_sync_stations(&config, dry_run),
    }
}
