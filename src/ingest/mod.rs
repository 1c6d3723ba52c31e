//! Data providers for the dashboard.
//!
//! Every external collaborator sits behind one of the traits below so the
//! dashboard can run against the live services or against deterministic
//! fixtures:
//!
//! - `SensorSource`: latest soil reading and recent reading history.
//! - `ReadingSink`: where simulated readings are written.
//! - `HistoricalSource`: AEMET monthly statistics per region.
//! - `ObservationProvider`: real-time AEMET station observations.
//!
//! Submodules:
//! - `aemet`: blocking AEMET OpenData client.
//! - `fixture`: in-memory providers with fixed data.
//! - `historical_csv`: parser for AEMET annual statistics CSV files.

pub mod aemet;
pub mod fixture;
pub mod historical_csv;

use crate::model::{MonthlyRecord, SensorReading, SourceError, StationObservation};
use crate::regions::RegionInfo;

/// Source of soil sensor readings.
pub trait SensorSource {
    /// The most recent reading by timestamp, or `None` if there are none.
    fn latest_reading(&mut self) -> Result<Option<SensorReading>, SourceError>;

    /// Up to `limit` of the most recent readings, oldest first.
    fn reading_history(&mut self, limit: usize) -> Result<Vec<SensorReading>, SourceError>;
}

/// Destination for newly produced readings.
pub trait ReadingSink {
    fn store_reading(&mut self, reading: &SensorReading) -> Result<(), SourceError>;
}

/// Source of historical monthly statistics.
pub trait HistoricalSource {
    /// The record for one region, parameter and year, if it exists.
    fn monthly_record(
        &mut self,
        region_id: &str,
        parameter_code: &str,
        year: i32,
    ) -> Result<Option<MonthlyRecord>, SourceError>;

    /// Every region with at least one record, for the region selector.
    fn regions(&mut self) -> Result<Vec<RegionInfo>, SourceError>;
}

/// Source of real-time weather station observations.
pub trait ObservationProvider {
    /// Recent observations for a station, in the order the source returns them.
    fn observations(&self, idema: &str) -> Result<Vec<StationObservation>, SourceError>;

    /// The newest observation for a station.
    fn latest_observation(&self, idema: &str) -> Result<StationObservation, SourceError> {
        latest_of(self.observations(idema)?)
            .ok_or_else(|| SourceError::NoDataAvailable(idema.to_string()))
    }
}

/// Newest observation by time. On ties the later entry wins, so a source
/// that lists oldest first still yields its last entry.
pub fn latest_of(observations: Vec<StationObservation>) -> Option<StationObservation> {
    observations.into_iter().max_by_key(|o| o.observed_at)
}

/// Decodes bytes as UTF-8, falling back to Latin-1. AEMET serves some
/// payloads and most CSV exports in ISO-8859-1.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn obs_at(hour: u32, name: &str) -> StationObservation {
        StationObservation {
            idema: "3195".to_string(),
            location_name: name.to_string(),
            observed_at: Utc.with_ymd_and_hms(2025, 5, 13, hour, 0, 0).unwrap(),
            temperature_c: None,
            relative_humidity: None,
            precipitation_mm: None,
        }
    }

    #[test]
    fn test_latest_of_picks_newest_regardless_of_order() {
        let newest = latest_of(vec![obs_at(11, "b"), obs_at(9, "a"), obs_at(10, "c")]);
        assert_eq!(newest.map(|o| o.location_name), Some("b".to_string()));
        assert!(latest_of(Vec::new()).is_none());
    }

    #[test]
    fn test_decode_text_falls_back_to_latin1() {
        assert_eq!(decode_text("Coruña".as_bytes()), "Coruña");
        // "Coruña" in ISO-8859-1
        let latin1 = [0x43, 0x6f, 0x72, 0x75, 0xf1, 0x61];
        assert_eq!(decode_text(&latin1), "Coruña");
    }
}
