//! End-to-end dashboard tests against in-memory sources.
//!
//! These tests cover the full offline pipeline:
//! 1. AEMET statistics CSV files → monthly records
//! 2. Records → historical baseline for the current month
//! 3. Latest reading + baseline → recommendations
//! 4. Region → weather station → real-time observation panel
//!
//! No network or database access; everything runs in CI.

use std::fs;

use chrono::{NaiveDate, TimeZone, Utc};

use soilmon_service::alert::recommendations::{EvaluationStatus, NO_DATA_MESSAGE};
use soilmon_service::dashboard::{
    Color, DashboardRequest, DashboardSettings, DashboardSources, DashboardView, build_dashboard,
    historical_chart,
};
use soilmon_service::dev_mode::DevMode;
use soilmon_service::ingest::fixture::{FixtureObservations, InMemoryHistory, InMemoryReadings};
use soilmon_service::ingest::historical_csv::import_directory;
use soilmon_service::ingest::{HistoricalSource, SensorSource};
use soilmon_service::model::{Month, SensorReading, UserProfile};
use soilmon_service::regions::{RegionDirectory, RegionKind, group_for_selector, preselect_region};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const PROVINCIAS_2020: &str = "\
parámetro;región;enero;febrero;marzo;abril;mayo;junio;julio;agosto;septiembre;octubre;noviembre;diciembre;anual
AD25;Valladolid;80,0;78,5;70,0;65,0;60,0;40,0;20,0;15,0;25,0;50,0;70,0;79,0;54,4
AD25;Madrid;70,0;68,0;60,0;55,0;50,0;35,0;18,0;14,0;22,0;45,0;62,0;69,0;47,3
";

const CUENCAS_2020: &str = "\
parámetro;región;enero;febrero;marzo;abril;mayo;junio;julio;agosto;septiembre;octubre;noviembre;diciembre;anual
AD25;Duero;75,0;74,0;66,0;60,0;55,0;38,0;19,0;14,0;24,0;48,0;66,0;74,0;51,0
";

fn imported_history() -> InMemoryHistory {
    let root = tempfile::tempdir().expect("tempdir");
    let year_dir = root.path().join("ebh_estadistica_anual_2020");
    fs::create_dir(&year_dir).expect("mkdir");
    fs::write(year_dir.join("AD25_2020_Provincias.csv"), PROVINCIAS_2020).expect("write");
    fs::write(year_dir.join("AD25_2020_GrandesCuencas.csv"), CUENCAS_2020).expect("write");

    let (records, summary) = import_directory(root.path()).expect("import");
    assert_eq!(summary.files_imported, 2);
    InMemoryHistory::new(records)
}

fn may_2025() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 13).unwrap()
}

fn dashboard_for(
    sensor: &mut dyn SensorSource,
    history: &mut dyn HistoricalSource,
    user: &UserProfile,
    region: Option<&str>,
) -> DashboardView {
    let now = Utc.with_ymd_and_hms(2025, 5, 13, 12, 0, 0).unwrap();
    let observations = FixtureObservations::new(now);
    let regions = RegionDirectory::builtin();
    let request = DashboardRequest {
        user,
        region_id: region,
        today: may_2025(),
        simulated: None,
    };
    let mut sources = DashboardSources {
        sensor,
        history,
        observations: &observations,
        regions: &regions,
    };
    build_dashboard(&request, &mut sources, &DashboardSettings::default()).expect("dashboard")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_imported_regions_group_for_selector() {
    let mut history = imported_history();
    let regions = history.regions().expect("regions");

    let groups = group_for_selector(&regions);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].kind, RegionKind::Provincia);
    assert_eq!(
        groups[0].regions.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        vec!["MADRID", "VALLADOLID"]
    );
    assert_eq!(groups[1].kind, RegionKind::GrandesCuencas);

    let user = UserProfile {
        username: Some("ana".into()),
        location: Some("Duero".into()),
    };
    let preselected = preselect_region(&user, &regions).expect("location matches imported basin");
    assert_eq!(preselected.id, "DUERO");
}

#[test]
fn test_dry_reading_against_imported_baseline() {
    let mut history = imported_history();
    let mut sensor = InMemoryReadings::new(vec![
        SensorReading::new()
            .with_ph(6.8)
            .with_humidity(30.0)
            .with_temperature(22.0)
            .with_timestamp(Utc.with_ymd_and_hms(2025, 5, 13, 8, 0, 0).unwrap()),
    ]);

    let view = dashboard_for(&mut sensor, &mut history, &UserProfile::default(), Some("Valladolid"));

    assert_eq!(view.recommendations.len(), 3);
    assert!(view.recommendations[0].text.starts_with("INFO Soil pH (6.8)"));
    let humidity = &view.recommendations[1];
    assert_eq!(humidity.color, Color::Red);
    assert!(humidity.text.contains("Level low, consider irrigation."));
    assert!(humidity.text.contains("Historical average for May in Valladolid: 60.0%"));
    assert!(humidity.text.contains("much drier than average"));
    assert_eq!(view.recommendations[2].color, Color::Green);

    // CSV casing still reaches the province station
    assert_eq!(view.region_id, "VALLADOLID");
    let values = view.realtime.values.expect("2517A observation");
    assert_eq!(values.idema, "2517A");

    let evaluation = view.evaluation.expect("evaluated");
    assert_eq!(evaluation.status, EvaluationStatus::Advisories);
    assert!(evaluation.has_issue);
}

#[test]
fn test_user_location_selects_region_and_station() {
    let mut history = imported_history();
    let mut sensor = InMemoryReadings::new(vec![
        SensorReading::new().with_ph(6.5).with_humidity(30.0).with_temperature(18.0),
    ]);
    let user = UserProfile {
        username: Some("luis".into()),
        location: Some("valladolid".into()),
    };

    let view = dashboard_for(&mut sensor, &mut history, &user, None);

    assert_eq!(view.region_id, "VALLADOLID");
    assert_eq!(view.title, "Dashboard: VALLADOLID - Soil Monitor");
    // Imported "Valladolid" baseline applies to the location-derived id
    let humidity = &view.recommendations[1];
    assert_eq!(humidity.color, Color::Red);
    assert!(humidity.text.contains("Historical average for May in Valladolid: 60.0%"));

    let values = view.realtime.values.expect("2517A observation");
    assert_eq!(values.idema, "2517A");
    assert_eq!(values.humidity, "48");
}

#[test]
fn test_seeded_store_feeds_dashboard() {
    let mut sensor = InMemoryReadings::default();
    let dev = DevMode::new(5, std::time::Duration::ZERO);
    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(3);
    let start = Utc.with_ymd_and_hms(2025, 5, 13, 6, 0, 0).unwrap();
    let summary = dev.seed_readings(&mut sensor, &mut rng, start);
    assert_eq!(summary.stored, 5);

    let newest = sensor.reading_history(5).expect("history").pop().expect("five readings");
    let mut history = imported_history();
    let view = dashboard_for(&mut sensor, &mut history, &UserProfile::default(), Some("Madrid"));

    assert_eq!(view.summary.temperature, format!("{:.1}", newest.temperature().unwrap()));
    assert_ne!(view.recommendations[0].text, NO_DATA_MESSAGE);
}

#[test]
fn test_historical_chart_from_imported_record() {
    let mut history = imported_history();
    let record = history
        .monthly_record("Duero", "AD25mm_GrandesCuencas", 2020)
        .expect("lookup")
        .expect("Duero imported");

    let chart = historical_chart(&record);
    assert_eq!(chart.label, "AD25mm_GrandesCuencas (2020)");
    assert_eq!(chart.x_labels[4], Month::May.label());
    assert_eq!(chart.values[4], Some(55.0));
    assert!(chart.values.iter().all(Option::is_some));
}
