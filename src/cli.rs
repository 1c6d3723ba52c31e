//! CLI argument definitions using clap
//!
//! The command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// soilmon - Soil monitoring dashboard with AEMET weather context
#[derive(Parser)]
#[command(name = "soilmon")]
#[command(about = "Soil sensor dashboard and AEMET data tools", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./soilmon.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the dashboard for a region
    Dashboard {
        /// Region id (e.g. MADRID); defaults to the user's location
        #[arg(short, long)]
        region: Option<String>,

        /// Registered user name
        #[arg(long)]
        username: Option<String>,

        /// Registered user location, used when no region is given
        #[arg(long)]
        location: Option<String>,

        /// Date whose month selects the historical baseline (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Show a freshly simulated reading instead of the stored one
        #[arg(long)]
        simulate: bool,

        /// Include historical and reading-history chart series (JSON only)
        #[arg(long)]
        charts: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List regions grouped for the region selector
    Regions {
        /// Registered user location to preselect
        #[arg(long)]
        location: Option<String>,
    },

    /// Import AEMET annual statistics CSV files
    ImportHistorical {
        /// Directory containing ebh_estadistica_anual_<YEAR> folders
        #[arg(short, long)]
        dir: PathBuf,

        /// Parse and report without writing to the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Write simulated sensor readings to the store
    Simulate {
        /// Number of readings
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Seconds between readings
        #[arg(long, default_value = "1")]
        interval_secs: u64,
    },

    /// Rebuild the province → AEMET station map from the station inventory
    SyncStations {
        /// Print the selection without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
}
