//! Command implementations for the CLI.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use serde_json::json;

use soilmon_service::config::{Config, ProviderKind};
use soilmon_service::dashboard::{
    self, DashboardRequest, DashboardSettings, DashboardSources, READING_HISTORY_LIMIT,
};
use soilmon_service::db::PgStore;
use soilmon_service::dev_mode::{self, DevMode, SimulationRanges};
use soilmon_service::ingest::aemet::AemetClient;
use soilmon_service::ingest::fixture::{FixtureObservations, InMemoryReadings, demo_history, demo_readings};
use soilmon_service::ingest::historical_csv;
use soilmon_service::ingest::{HistoricalSource, ObservationProvider, SensorSource};
use soilmon_service::logging::{self, DataSource};
use soilmon_service::model::UserProfile;
use soilmon_service::regions::{self, RegionDirectory};

// ---------------------------------------------------------------------------
// Source wiring
// ---------------------------------------------------------------------------

/// Data sources for one run: PostgreSQL when a database is configured,
/// otherwise the built-in demo data.
struct Backends {
    sensor: Box<dyn SensorSource>,
    history: Box<dyn HistoricalSource>,
    observations: Box<dyn ObservationProvider>,
    regions: RegionDirectory,
}

fn open_backends(config: &Config) -> Result<Backends> {
    let observations: Box<dyn ObservationProvider> = match config.provider.kind {
        ProviderKind::Fixture => Box::new(FixtureObservations::new(Utc::now())),
        ProviderKind::Aemet => Box::new(aemet_client(config)?),
    };

    match config.database_url() {
        Ok(url) => {
            // Separate connections: the dashboard borrows both mutably.
            let sensor = PgStore::open(url).context("Failed to open reading store")?;
            let mut history = PgStore::open(url).context("Failed to open historical store")?;
            let stations = history.load_station_map().context("Failed to load station map")?;
            let regions = if stations.is_empty() {
                tracing::info!("Station map empty, using built-in provinces");
                RegionDirectory::builtin()
            } else {
                RegionDirectory::from_mappings(stations)
            };
            Ok(Backends {
                sensor: Box::new(sensor),
                history: Box::new(history),
                observations,
                regions,
            })
        }
        Err(_) => {
            tracing::info!("No database configured, using demo data");
            Ok(Backends {
                sensor: Box::new(InMemoryReadings::new(demo_readings(Utc::now()))),
                history: Box::new(demo_history()),
                observations,
                regions: RegionDirectory::builtin(),
            })
        }
    }
}

fn aemet_client(config: &Config) -> Result<AemetClient> {
    let key = config.aemet_api_key()?;
    AemetClient::new(&key, &config.aemet.base_url, config.aemet.timeout())
        .context("Failed to build AEMET client")
}

// ---------------------------------------------------------------------------
// dashboard
// ---------------------------------------------------------------------------

pub struct DashboardArgs {
    pub region: Option<String>,
    pub username: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub simulate: bool,
    pub charts: bool,
    pub json: bool,
}

pub fn cmd_dashboard(config: &Config, args: DashboardArgs) -> Result<()> {
    let mut backends = open_backends(config)?;
    let settings = DashboardSettings::from(config);
    let user = UserProfile {
        username: args.username,
        location: args.location,
    };

    let simulated = args.simulate.then(|| {
        dev_mode::simulate_reading(&mut rand::rng(), &SimulationRanges::MANUAL_TRIGGER, Utc::now())
    });
    let request = DashboardRequest {
        user: &user,
        region_id: args.region.as_deref(),
        today: args.date.unwrap_or_else(|| Utc::now().date_naive()),
        simulated,
    };

    let view = {
        let mut sources = DashboardSources {
            sensor: backends.sensor.as_mut(),
            history: backends.history.as_mut(),
            observations: backends.observations.as_ref(),
            regions: &backends.regions,
        };
        dashboard::build_dashboard(&request, &mut sources, &settings)?
    };

    if !args.json {
        if let Some(name) = &user.username {
            println!("Welcome, {}\n", name);
        }
        print!("{}", view);
        return Ok(());
    }

    let mut output = serde_json::to_value(&view)?;
    if args.charts {
        let historical = backends
            .history
            .monthly_record(&view.region_id, &settings.parameter_code, settings.reference_year)
            .context("Failed to fetch historical record")?
            .map(|record| dashboard::historical_chart(&record));
        let readings = backends
            .sensor
            .reading_history(READING_HISTORY_LIMIT)
            .context("Failed to fetch reading history")?;
        output["charts"] = json!({
            "historical": historical,
            "readings": dashboard::reading_series(&readings),
        });
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// regions
// ---------------------------------------------------------------------------

pub fn cmd_regions(config: &Config, location: Option<String>) -> Result<()> {
    let mut backends = open_backends(config)?;
    let known = backends.history.regions().context("Failed to list regions")?;

    let user = UserProfile {
        username: None,
        location,
    };
    let preselected = regions::preselect_region(&user, &known).map(|r| r.id.clone());

    for group in regions::group_for_selector(&known) {
        println!("{}", group.kind.label());
        for region in group.regions {
            let marker = if preselected.as_deref() == Some(region.id.as_str()) { "*" } else { " " };
            println!(" {} {:<32} {}", marker, region.id, backends.regions.display_name(&region.id));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// import-historical
// ---------------------------------------------------------------------------

pub fn cmd_import_historical(config: &Config, dir: &Path, dry_run: bool) -> Result<()> {
    if !dir.is_dir() {
        bail!("Data directory not found: {}", dir.display());
    }

    let (records, summary) = historical_csv::import_directory(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?;

    println!(
        "Parsed {} records from {} files ({} skipped, {} failed, {} rows dropped)",
        summary.records, summary.files_imported, summary.files_skipped, summary.files_failed, summary.skipped_rows
    );
    logging::log_batch_summary(DataSource::Import, "CSV import", summary.files_imported, summary.files_failed);

    if dry_run {
        return Ok(());
    }

    let url = config.database_url()?;
    let mut store = PgStore::open(url).context("Failed to open store")?;
    let written = store.upsert_monthly_records(&records)?;
    println!("Stored {} records", written);
    Ok(())
}

// ---------------------------------------------------------------------------
// simulate
// ---------------------------------------------------------------------------

pub fn cmd_simulate(config: &Config, count: usize, interval_secs: u64) -> Result<()> {
    let dev = DevMode::new(count, Duration::from_secs(interval_secs));
    let mut rng = rand::rng();

    let summary = match config.database_url() {
        Ok(url) => {
            let mut store = PgStore::open(url).context("Failed to open reading store")?;
            dev.seed_readings(&mut store, &mut rng, Utc::now())
        }
        Err(_) => {
            tracing::warn!("No database configured, readings are printed only");
            let mut sink = InMemoryReadings::default();
            let summary = dev.seed_readings(&mut sink, &mut rng, Utc::now());
            for reading in sink.readings() {
                println!("{}", serde_json::to_string(reading)?);
            }
            summary
        }
    };

    println!("Stored {} of {} readings", summary.stored, count);
    if summary.stored == 0 && count > 0 {
        bail!("No readings were stored");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// sync-stations
// ---------------------------------------------------------------------------

pub fn cmd_sync_stations(config: &Config, dry_run: bool) -> Result<()> {
    let client = aemet_client(config)?;
    let inventory = client.fetch_inventory().map_err(|e| {
        logging::log_source_failure(DataSource::Aemet, None, "Fetch station inventory", &e);
        e
    })?;

    let selected = regions::select_one_station_per_province(&inventory);
    for mapping in &selected {
        println!("{:<28} {:<8} {}", mapping.region_id, mapping.idema, mapping.station_name);
    }

    if dry_run {
        println!("{} provinces (dry run, nothing stored)", selected.len());
        return Ok(());
    }

    let url = config.database_url()?;
    let mut store = PgStore::open(url).context("Failed to open station store")?;
    let mut failed = 0;
    for mapping in &selected {
        if let Err(e) = store.upsert_station_mapping(mapping) {
            logging::log_source_failure(DataSource::Database, Some(mapping.region_id.as_str()), "Store station mapping", &e);
            failed += 1;
        }
    }
    logging::log_batch_summary(DataSource::Database, "Station sync", selected.len() - failed, failed);
    println!("Stored {} of {} station mappings", selected.len() - failed, selected.len());
    Ok(())
}
