//! PostgreSQL store for sensor readings, historical statistics and the
//! province station map.
//!
//! Schema lives in `sql/001_schema.sql`. Three schemas are expected:
//! `sensor` (readings), `aemet` (historical statistics) and `stations`
//! (province → AEMET station map).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use postgres::{Client, NoTls, Row};
use tracing::{debug, info};

use crate::ingest::{HistoricalSource, ReadingSink, SensorSource};
use crate::model::{Month, MonthlyRecord, SensorReading, SourceError};
use crate::regions::{RegionInfo, RegionKind, StationMapping};

/// Schemas the store needs before it can be used.
pub const REQUIRED_SCHEMAS: [&str; 3] = ["sensor", "aemet", "stations"];

/// Opens a connection without checking the schema.
pub fn connect(url: &str) -> Result<Client, SourceError> {
    let client = Client::connect(url, NoTls)?;
    debug!("Connected to PostgreSQL");
    Ok(client)
}

/// Opens a connection and checks that every schema in `schemas` exists.
///
/// Fails with `SourceError::MissingSchema` naming the absent schemas, so
/// a missing migration is reported before the first query does.
pub fn connect_and_verify(url: &str, schemas: &[&str]) -> Result<Client, SourceError> {
    let mut client = connect(url)?;

    let mut missing = Vec::new();
    for schema in schemas {
        let row = client.query_one(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.schemata WHERE schema_name = $1
            )",
            &[schema],
        )?;
        if !row.get::<_, bool>(0) {
            missing.push(*schema);
        }
    }

    if !missing.is_empty() {
        return Err(SourceError::MissingSchema(format!(
            "{} (apply sql/001_schema.sql)",
            missing.join(", ")
        )));
    }

    Ok(client)
}

/// Store backed by a single blocking PostgreSQL connection.
pub struct PgStore {
    client: Client,
}

impl PgStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects and verifies `REQUIRED_SCHEMAS`.
    pub fn open(url: &str) -> Result<Self, SourceError> {
        connect_and_verify(url, &REQUIRED_SCHEMAS).map(Self::new)
    }

    // ------------------------------------------------------------------
    // Historical statistics
    // ------------------------------------------------------------------

    /// Inserts or replaces one region/parameter/year record and its
    /// monthly values in a single transaction.
    pub fn upsert_monthly_record(&mut self, record: &MonthlyRecord) -> Result<(), SourceError> {
        let mut tx = self.client.transaction()?;

        tx.execute(
            "INSERT INTO aemet.historical_records
                (region_id, parameter_code, year, region_original, parameter_description, source_file)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (region_id, parameter_code, year) DO UPDATE SET
                region_original = EXCLUDED.region_original,
                parameter_description = EXCLUDED.parameter_description,
                source_file = EXCLUDED.source_file",
            &[
                &record.region_id,
                &record.parameter_code,
                &record.year,
                &record.region_original,
                &record.parameter_description,
                &record.source_file,
            ],
        )?;

        tx.execute(
            "DELETE FROM aemet.historical_monthly
             WHERE region_id = $1 AND parameter_code = $2 AND year = $3",
            &[&record.region_id, &record.parameter_code, &record.year],
        )?;

        for (month, value) in &record.monthly_values {
            let month_number = month.number() as i16;
            tx.execute(
                "INSERT INTO aemet.historical_monthly
                    (region_id, parameter_code, year, month, value)
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &record.region_id,
                    &record.parameter_code,
                    &record.year,
                    &month_number,
                    value,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Upserts every record, returning how many were written.
    pub fn upsert_monthly_records(&mut self, records: &[MonthlyRecord]) -> Result<usize, SourceError> {
        for record in records {
            self.upsert_monthly_record(record)?;
        }
        info!(count = records.len(), "Stored historical records");
        Ok(records.len())
    }

    // ------------------------------------------------------------------
    // Station map
    // ------------------------------------------------------------------

    pub fn upsert_station_mapping(&mut self, mapping: &StationMapping) -> Result<(), SourceError> {
        self.client.execute(
            "INSERT INTO stations.province_stations
                (region_id, provincia, idema, station_name, latitude, longitude, altitude, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
             ON CONFLICT (region_id) DO UPDATE SET
                provincia = EXCLUDED.provincia,
                idema = EXCLUDED.idema,
                station_name = EXCLUDED.station_name,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                altitude = EXCLUDED.altitude,
                updated_at = NOW()",
            &[
                &mapping.region_id,
                &mapping.provincia,
                &mapping.idema,
                &mapping.station_name,
                &mapping.latitude,
                &mapping.longitude,
                &mapping.altitude,
            ],
        )?;
        Ok(())
    }

    /// The synchronized station map, sorted by region id. Empty when the
    /// map has never been synchronized.
    pub fn load_station_map(&mut self) -> Result<Vec<StationMapping>, SourceError> {
        let rows = self.client.query(
            "SELECT region_id, provincia, idema, station_name, latitude, longitude, altitude
             FROM stations.province_stations
             ORDER BY region_id",
            &[],
        )?;

        Ok(rows
            .iter()
            .map(|row| StationMapping {
                region_id: row.get(0),
                provincia: row.get(1),
                idema: row.get(2),
                station_name: row.get(3),
                latitude: row.get(4),
                longitude: row.get(5),
                altitude: row.get(6),
            })
            .collect())
    }
}

fn reading_from_row(row: &Row) -> SensorReading {
    SensorReading::from_parts(
        row.get::<_, Option<f64>>(0),
        row.get::<_, Option<f64>>(1),
        row.get::<_, Option<f64>>(2),
        row.get::<_, Option<DateTime<Utc>>>(3),
    )
}

impl SensorSource for PgStore {
    fn latest_reading(&mut self) -> Result<Option<SensorReading>, SourceError> {
        let row = self.client.query_opt(
            "SELECT temperature, ph, humidity, recorded_at
             FROM sensor.readings
             ORDER BY recorded_at DESC NULLS LAST, id DESC
             LIMIT 1",
            &[],
        )?;
        Ok(row.as_ref().map(reading_from_row))
    }

    fn reading_history(&mut self, limit: usize) -> Result<Vec<SensorReading>, SourceError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.client.query(
            "SELECT temperature, ph, humidity, recorded_at FROM (
                SELECT id, temperature, ph, humidity, recorded_at
                FROM sensor.readings
                WHERE recorded_at IS NOT NULL
                ORDER BY recorded_at DESC, id DESC
                LIMIT $1
             ) recent
             ORDER BY recorded_at ASC, id ASC",
            &[&limit],
        )?;
        Ok(rows.iter().map(reading_from_row).collect())
    }
}

impl ReadingSink for PgStore {
    fn store_reading(&mut self, reading: &SensorReading) -> Result<(), SourceError> {
        self.client.execute(
            "INSERT INTO sensor.readings (temperature, ph, humidity, recorded_at)
             VALUES ($1, $2, $3, COALESCE($4, NOW()))",
            &[
                &reading.temperature(),
                &reading.ph(),
                &reading.humidity(),
                &reading.timestamp(),
            ],
        )?;
        Ok(())
    }
}

impl HistoricalSource for PgStore {
    fn monthly_record(
        &mut self,
        region_id: &str,
        parameter_code: &str,
        year: i32,
    ) -> Result<Option<MonthlyRecord>, SourceError> {
        // Rows written by older imports may not be upper-cased
        let header = self.client.query_opt(
            "SELECT region_id, region_original, parameter_description, source_file
             FROM aemet.historical_records
             WHERE upper(region_id) = upper($1) AND parameter_code = $2 AND year = $3
             ORDER BY region_id
             LIMIT 1",
            &[&region_id, &parameter_code, &year],
        )?;
        let Some(header) = header else {
            return Ok(None);
        };
        let stored_id: String = header.get(0);
        let region_id = stored_id.as_str();

        let rows = self.client.query(
            "SELECT month, value
             FROM aemet.historical_monthly
             WHERE region_id = $1 AND parameter_code = $2 AND year = $3
             ORDER BY month",
            &[&region_id, &parameter_code, &year],
        )?;

        let mut monthly_values = BTreeMap::new();
        for row in &rows {
            let number: i16 = row.get(0);
            let month = u32::try_from(number)
                .ok()
                .and_then(Month::from_number)
                .ok_or_else(|| SourceError::Parse(format!("invalid month number {}", number)))?;
            monthly_values.insert(month, row.get::<_, Option<f64>>(1));
        }

        Ok(Some(MonthlyRecord {
            region_id: region_id.to_string(),
            region_original: header.get(1),
            parameter_code: parameter_code.to_string(),
            parameter_description: header.get(2),
            year,
            monthly_values,
            source_file: header.get(3),
        }))
    }

    fn regions(&mut self) -> Result<Vec<RegionInfo>, SourceError> {
        let rows = self.client.query(
            "SELECT DISTINCT region_id, parameter_code
             FROM aemet.historical_records
             ORDER BY region_id, parameter_code",
            &[],
        )?;

        let mut kinds: BTreeMap<String, RegionKind> = BTreeMap::new();
        for row in &rows {
            let id: String = row.get(0);
            let code: String = row.get(1);
            kinds
                .entry(id)
                .or_insert_with(|| RegionKind::from_parameter_code(&code));
        }

        Ok(kinds
            .into_iter()
            .map(|(id, kind)| RegionInfo { id, kind })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_store() -> PgStore {
        dotenv::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PgStore::open(&url).expect("database with sql/001_schema.sql applied")
    }

    #[test]
    #[ignore] // Don't run in CI - requires PostgreSQL
    fn test_missing_schema_is_reported() {
        dotenv::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let err = connect_and_verify(&url, &["sensor", "no_such_schema_xyz"])
            .err()
            .expect("schema check should fail");
        assert!(matches!(err, SourceError::MissingSchema(ref s) if s.contains("no_such_schema_xyz")));
    }

    #[test]
    #[ignore] // Don't run in CI - requires PostgreSQL
    fn test_store_and_read_back_reading() {
        let mut store = test_store();
        let at = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        let reading = SensorReading::new()
            .with_temperature(21.5)
            .with_ph(6.8)
            .with_humidity(44.0)
            .with_timestamp(at);

        store.store_reading(&reading).expect("insert");
        let latest = store.latest_reading().expect("query").expect("row");
        assert_eq!(latest, reading);

        store
            .store_reading(&reading.clone().with_timestamp(at - Duration::minutes(5)))
            .expect("insert");
        let history = store.reading_history(2).expect("query");
        assert_eq!(history.len(), 2);
        assert!(history[0].timestamp() < history[1].timestamp());

        store
            .client
            .execute("DELETE FROM sensor.readings WHERE recorded_at >= '2098-12-31'", &[])
            .expect("cleanup");
    }

    #[test]
    #[ignore] // Don't run in CI - requires PostgreSQL
    fn test_monthly_record_upsert_round_trip() {
        let mut store = test_store();
        let mut monthly_values = BTreeMap::new();
        monthly_values.insert(Month::January, Some(61.0));
        monthly_values.insert(Month::February, None);
        let record = MonthlyRecord {
            region_id: "TEST_REGION".to_string(),
            region_original: "Test Region".to_string(),
            parameter_code: "AD25mm_Provincias".to_string(),
            parameter_description: "test".to_string(),
            year: 1900,
            monthly_values,
            source_file: "AD25_1900_Provincias.csv".to_string(),
        };

        store.upsert_monthly_record(&record).expect("upsert");
        store.upsert_monthly_record(&record).expect("second upsert replaces");

        let loaded = store
            .monthly_record("TEST_REGION", "AD25mm_Provincias", 1900)
            .expect("query")
            .expect("record exists");
        assert_eq!(loaded, record);

        let mixed_case = store
            .monthly_record("Test_Region", "AD25mm_Provincias", 1900)
            .expect("query")
            .expect("lookup ignores case");
        assert_eq!(mixed_case.region_id, "TEST_REGION");

        let regions = store.regions().expect("query");
        assert!(regions
            .iter()
            .any(|r| r.id == "TEST_REGION" && r.kind == RegionKind::Provincia));

        store
            .client
            .execute("DELETE FROM aemet.historical_records WHERE region_id = 'TEST_REGION'", &[])
            .expect("cleanup");
    }
}
