//! Deterministic in-memory providers.
//!
//! Used by the test suite and by the CLI when no database or AEMET key is
//! configured. Nothing here touches the network or the clock: "now" is
//! always passed in.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::ingest::{HistoricalSource, ObservationProvider, ReadingSink, SensorSource};
use crate::model::{Month, MonthlyRecord, SensorReading, SourceError, StationObservation};
use crate::regions::{RegionInfo, RegionKind, sanitize_region_id};

/// Station identifier for which the fixture always reports "not found".
pub const FAILING_IDEMA: &str = "9999X_FAIL";

// ---------------------------------------------------------------------------
// Station observations
// ---------------------------------------------------------------------------

/// Fixed observation table keyed by IDEMA.
///
/// Known stations return their table entries; `FAILING_IDEMA` returns
/// `StationNotFound`; any other station returns a single generic
/// observation stamped at `now`.
pub struct FixtureObservations {
    stations: BTreeMap<String, Vec<StationObservation>>,
    now: DateTime<Utc>,
}

impl FixtureObservations {
    /// Table with the two reference stations used in the dashboard demos.
    pub fn new(now: DateTime<Utc>) -> Self {
        let fuente_el_sol = |hour, hr, ta| StationObservation {
            idema: "2517A".to_string(),
            location_name: "FUENTE EL SOL".to_string(),
            observed_at: Utc
                .with_ymd_and_hms(2025, 5, 13, hour, 0, 0)
                .single()
                .unwrap_or(now),
            temperature_c: Some(ta),
            relative_humidity: Some(hr),
            precipitation_mm: Some(0.0),
        };
        let albacete = |hours_ago, prec, hr, ta| StationObservation {
            idema: "8175".to_string(),
            location_name: "ALBACETE BASE AÉREA".to_string(),
            observed_at: now - Duration::hours(hours_ago),
            temperature_c: Some(ta),
            relative_humidity: Some(hr),
            precipitation_mm: Some(prec),
        };

        let mut stations = BTreeMap::new();
        stations.insert(
            "2517A".to_string(),
            vec![fuente_el_sol(9, 53.0, 14.5), fuente_el_sol(10, 48.0, 15.4)],
        );
        stations.insert(
            "8175".to_string(),
            vec![albacete(2, 0.1, 65.0, 18.2), albacete(1, 0.0, 60.0, 19.5)],
        );

        Self { stations, now }
    }

    /// Empty table: every station except `FAILING_IDEMA` gets the generic
    /// observation.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            stations: BTreeMap::new(),
            now,
        }
    }

    pub fn with_station(mut self, idema: &str, observations: Vec<StationObservation>) -> Self {
        self.stations.insert(idema.to_string(), observations);
        self
    }

    fn generic(&self, idema: &str) -> StationObservation {
        let short: String = idema.chars().take(4).collect();
        StationObservation {
            idema: idema.to_string(),
            location_name: format!("Simulated station {}", short),
            observed_at: self.now,
            temperature_c: Some(15.0),
            relative_humidity: Some(50.0),
            precipitation_mm: Some(0.0),
        }
    }
}

impl ObservationProvider for FixtureObservations {
    fn observations(&self, idema: &str) -> Result<Vec<StationObservation>, SourceError> {
        if idema == FAILING_IDEMA {
            return Err(SourceError::StationNotFound(idema.to_string()));
        }
        Ok(self
            .stations
            .get(idema)
            .cloned()
            .unwrap_or_else(|| vec![self.generic(idema)]))
    }
}

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

/// Reading store backed by a `Vec`. Can be switched to fail every call to
/// exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryReadings {
    readings: Vec<SensorReading>,
    unavailable: bool,
}

impl InMemoryReadings {
    pub fn new(readings: Vec<SensorReading>) -> Self {
        Self {
            readings,
            unavailable: false,
        }
    }

    /// A store whose every call fails with HTTP 503.
    pub fn unavailable() -> Self {
        Self {
            readings: Vec::new(),
            unavailable: true,
        }
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    fn check(&self) -> Result<(), SourceError> {
        if self.unavailable {
            Err(SourceError::HttpStatus(503))
        } else {
            Ok(())
        }
    }
}

impl SensorSource for InMemoryReadings {
    fn latest_reading(&mut self) -> Result<Option<SensorReading>, SourceError> {
        self.check()?;
        // Readings without a timestamp sort first, so they only win when
        // nothing is timestamped.
        Ok(self.readings.iter().max_by_key(|r| r.timestamp()).cloned())
    }

    fn reading_history(&mut self, limit: usize) -> Result<Vec<SensorReading>, SourceError> {
        self.check()?;
        let mut sorted = self.readings.clone();
        sorted.sort_by_key(|r| r.timestamp());
        let skip = sorted.len().saturating_sub(limit);
        Ok(sorted.into_iter().skip(skip).collect())
    }
}

impl ReadingSink for InMemoryReadings {
    fn store_reading(&mut self, reading: &SensorReading) -> Result<(), SourceError> {
        self.check()?;
        self.readings.push(reading.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Historical statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: Vec<MonthlyRecord>,
}

impl InMemoryHistory {
    pub fn new(records: Vec<MonthlyRecord>) -> Self {
        Self { records }
    }
}

impl HistoricalSource for InMemoryHistory {
    fn monthly_record(
        &mut self,
        region_id: &str,
        parameter_code: &str,
        year: i32,
    ) -> Result<Option<MonthlyRecord>, SourceError> {
        let wanted = sanitize_region_id(region_id);
        Ok(self
            .records
            .iter()
            .find(|r| {
                sanitize_region_id(&r.region_id) == wanted
                    && r.parameter_code == parameter_code
                    && r.year == year
            })
            .cloned())
    }

    fn regions(&mut self) -> Result<Vec<RegionInfo>, SourceError> {
        let mut seen: BTreeMap<String, RegionKind> = BTreeMap::new();
        for record in &self.records {
            seen.entry(record.region_id.clone())
                .or_insert_with(|| RegionKind::from_parameter_code(&record.parameter_code));
        }
        Ok(seen
            .into_iter()
            .map(|(id, kind)| RegionInfo { id, kind })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Demo data
// ---------------------------------------------------------------------------

/// A day of hourly readings ending at `now`, drifting gently.
pub fn demo_readings(now: DateTime<Utc>) -> Vec<SensorReading> {
    (0..24)
        .map(|i| {
            let step = i as f64;
            SensorReading::new()
                .with_temperature(18.0 + step * 0.25)
                .with_ph(6.4 + (step % 4.0) * 0.05)
                .with_humidity(62.0 - step * 0.5)
                .with_timestamp(now - Duration::hours(23 - i))
        })
        .collect()
}

/// `AD25mm_Provincias` statistics for 2020 for the built-in provinces.
pub fn demo_history() -> InMemoryHistory {
    let profile = [
        72.0, 70.5, 64.0, 58.5, 49.0, 38.0, 27.5, 25.0, 34.0, 51.0, 63.5, 71.0,
    ];
    let provinces = [
        ("A CORUÑA", "A Coruña", 1.25),
        ("ALBACETE", "Albacete", 0.7),
        ("MADRID", "Madrid", 0.8),
        ("SEVILLA", "Sevilla", 0.75),
        ("VALLADOLID", "Valladolid", 0.9),
    ];

    let records = provinces
        .iter()
        .map(|&(id, name, factor)| MonthlyRecord {
            region_id: id.to_string(),
            region_original: name.to_string(),
            parameter_code: "AD25mm_Provincias".to_string(),
            parameter_description: "Agua disponible en el suelo (25 mm)".to_string(),
            year: 2020,
            monthly_values: Month::ALL
                .iter()
                .zip(profile)
                .map(|(&m, v)| (m, Some(((v * factor) * 10.0_f64).round() / 10.0)))
                .collect(),
            source_file: "AD25_2020_Provincias.csv".to_string(),
        })
        .collect();

    InMemoryHistory::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 13, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_known_station_latest_is_newest_entry() {
        let fixture = FixtureObservations::new(fixed_now());
        let latest = fixture.latest_observation("2517A").expect("known station");
        assert_eq!(latest.temperature_c, Some(15.4));
        assert_eq!(latest.relative_humidity, Some(48.0));

        let albacete = fixture.latest_observation("8175").expect("known station");
        assert_eq!(albacete.observed_at, fixed_now() - Duration::hours(1));
    }

    #[test]
    fn test_failing_station_is_not_found() {
        let fixture = FixtureObservations::new(fixed_now());
        let err = fixture.latest_observation(FAILING_IDEMA).unwrap_err();
        assert!(matches!(err, SourceError::StationNotFound(_)));
    }

    #[test]
    fn test_unknown_station_gets_deterministic_generic_observation() {
        let fixture = FixtureObservations::new(fixed_now());
        let a = fixture.latest_observation("3195").expect("generic");
        let b = fixture.latest_observation("3195").expect("generic");
        assert_eq!(a, b);
        assert_eq!(a.location_name, "Simulated station 3195");
        assert_eq!(a.observed_at, fixed_now());
    }

    #[test]
    fn test_empty_station_list_is_no_data() {
        let fixture = FixtureObservations::empty(fixed_now()).with_station("1387", Vec::new());
        let err = fixture.latest_observation("1387").unwrap_err();
        assert!(matches!(err, SourceError::NoDataAvailable(_)));
    }

    #[test]
    fn test_latest_reading_is_most_recent_by_timestamp() {
        let now = fixed_now();
        let mut store = InMemoryReadings::new(vec![
            SensorReading::new().with_ph(6.0).with_timestamp(now),
            SensorReading::new().with_ph(7.0).with_timestamp(now - Duration::hours(1)),
            SensorReading::new().with_ph(5.0),
        ]);
        let latest = store.latest_reading().expect("available").expect("non-empty");
        assert_eq!(latest.ph(), Some(6.0));
    }

    #[test]
    fn test_empty_store_has_no_latest_reading() {
        let mut store = InMemoryReadings::default();
        assert_eq!(store.latest_reading().expect("available"), None);
    }

    #[test]
    fn test_reading_history_is_oldest_first_and_limited() {
        let now = fixed_now();
        let mut store = InMemoryReadings::new(demo_readings(now));
        let history = store.reading_history(5).expect("available");
        assert_eq!(history.len(), 5);
        assert_eq!(history[4].timestamp(), Some(now));
        assert!(history[0].timestamp() < history[1].timestamp());
    }

    #[test]
    fn test_unavailable_store_fails_every_call() {
        let mut store = InMemoryReadings::unavailable();
        assert!(store.latest_reading().is_err());
        assert!(store.reading_history(3).is_err());
        assert!(store.store_reading(&SensorReading::new()).is_err());
    }

    #[test]
    fn test_demo_history_lists_provinces() {
        let mut history = demo_history();
        let regions = history.regions().expect("in memory");
        assert_eq!(regions.len(), 5);
        assert!(regions.iter().all(|r| r.kind == RegionKind::Provincia));

        let record = history
            .monthly_record("MADRID", "AD25mm_Provincias", 2020)
            .expect("in memory")
            .expect("Madrid exists");
        assert_eq!(record.value_for(Month::January), Some(57.6));
        assert!(history
            .monthly_record("MADRID", "AD25mm_Provincias", 2019)
            .expect("in memory")
            .is_none());
    }
}
