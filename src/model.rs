//! Core data types for the soil monitoring service.
//!
//! This module defines the shared domain model imported by all other modules:
//! sensor readings, historical reference data, advisory messages and the
//! error type returned by every data source. It contains no I/O.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// One sampled set of soil sensor values.
///
/// Every field is optional: a probe may be offline or a document may be
/// missing a key. Non-finite or non-numeric values are dropped at
/// construction and deserialization time, so the accessors only ever return
/// usable numbers. The source documents use Spanish keys (`temperatura`,
/// `humedad`), which are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(default, alias = "temperatura", deserialize_with = "lenient_f64")]
    temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    ph: Option<f64>,
    #[serde(default, alias = "humedad", deserialize_with = "lenient_f64")]
    humidity: Option<f64>,
    #[serde(default, alias = "sensor_timestamp", deserialize_with = "lenient_timestamp")]
    timestamp: Option<DateTime<Utc>>,
}

impl SensorReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature = finite(celsius);
        self
    }

    pub fn with_ph(mut self, ph: f64) -> Self {
        self.ph = finite(ph);
        self
    }

    pub fn with_humidity(mut self, percent: f64) -> Self {
        self.humidity = finite(percent);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builds a reading from nullable columns, as returned by the store.
    pub fn from_parts(
        temperature: Option<f64>,
        ph: Option<f64>,
        humidity: Option<f64>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            temperature: temperature.and_then(finite),
            ph: ph.and_then(finite),
            humidity: humidity.and_then(finite),
            timestamp,
        }
    }

    /// Air/soil temperature in °C.
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn ph(&self) -> Option<f64> {
        self.ph
    }

    /// Relative soil humidity in percent.
    pub fn humidity(&self) -> Option<f64> {
        self.humidity
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// True when none of the measured values is present.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.ph.is_none() && self.humidity.is_none()
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Accepts JSON numbers and numeric strings (comma or dot decimals).
/// Anything else, including `null`, becomes `None`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
    .and_then(finite))
}

/// Accepts RFC 3339 strings, epoch seconds, or a `{ "seconds": n }` object.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let seconds = |n: &serde_json::Number| n.as_i64().and_then(|s| Utc.timestamp_opt(s, 0).single());
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => seconds(&n),
        serde_json::Value::Object(map) => match map.get("seconds") {
            Some(serde_json::Value::Number(n)) => seconds(n),
            _ => None,
        },
        _ => None,
    }))
}

// ---------------------------------------------------------------------------
// Calendar months
// ---------------------------------------------------------------------------

/// Calendar month. Historical data is keyed by the lowercase Spanish month
/// name (`enero` … `diciembre`), which is what `key()` / `from_key()` use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Month from its 1-based number (1 = January).
    pub fn from_number(number: u32) -> Option<Month> {
        Self::ALL.get(number.checked_sub(1)? as usize).copied()
    }

    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    /// Month of a date, as returned by `chrono::Datelike::month`.
    pub fn of<D: chrono::Datelike>(date: &D) -> Month {
        // month0() is always 0..=11
        Self::ALL[date.month0() as usize]
    }

    /// Storage key used by the historical data set.
    pub fn key(self) -> &'static str {
        match self {
            Month::January => "enero",
            Month::February => "febrero",
            Month::March => "marzo",
            Month::April => "abril",
            Month::May => "mayo",
            Month::June => "junio",
            Month::July => "julio",
            Month::August => "agosto",
            Month::September => "septiembre",
            Month::October => "octubre",
            Month::November => "noviembre",
            Month::December => "diciembre",
        }
    }

    /// Parses a storage key, ignoring case and surrounding whitespace.
    pub fn from_key(key: &str) -> Option<Month> {
        let key = key.trim().to_lowercase();
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    /// Capitalised storage key, used as a chart axis label ("Enero").
    pub fn label(self) -> String {
        let key = self.key();
        let mut chars = key.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        };
        write!(f, "{}", name)
    }
}

// ---------------------------------------------------------------------------
// Historical reference data
// ---------------------------------------------------------------------------

/// Long-term monthly average used as a comparison baseline for humidity.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalContext {
    pub monthly_average_humidity: f64,
    pub month: Month,
    pub region_label: String,
}

impl HistoricalContext {
    /// The region label is shortened to the text before the first `(`,
    /// so "Madrid (Comunidad de)" is cited as "Madrid".
    pub fn new(monthly_average_humidity: f64, month: Month, region_label: &str) -> Self {
        let short = region_label.split('(').next().unwrap_or_default().trim();
        Self {
            monthly_average_humidity,
            month,
            region_label: short.to_string(),
        }
    }
}

/// One region × parameter × year row of AEMET annual statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    /// Sanitized region identifier (see `regions::sanitize_region_id`).
    pub region_id: String,
    /// Region name exactly as it appeared in the source file, trimmed.
    pub region_original: String,
    /// Parameter code with aggregation suffix, e.g. `AD25mm_Provincias`.
    pub parameter_code: String,
    pub parameter_description: String,
    pub year: i32,
    pub monthly_values: BTreeMap<Month, Option<f64>>,
    pub source_file: String,
}

impl MonthlyRecord {
    pub fn value_for(&self, month: Month) -> Option<f64> {
        self.monthly_values.get(&month).copied().flatten()
    }

    /// Builds the comparison baseline for `month`, if that month has a value.
    pub fn context_for(&self, month: Month, fallback_label: &str) -> Option<HistoricalContext> {
        let value = self.value_for(month)?;
        let label = if self.region_original.is_empty() {
            fallback_label
        } else {
            &self.region_original
        };
        Some(HistoricalContext::new(value, month, label))
    }
}

// ---------------------------------------------------------------------------
// Weather station observations
// ---------------------------------------------------------------------------

/// A conventional observation from an AEMET weather station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationObservation {
    /// AEMET station identifier (IDEMA).
    pub idema: String,
    pub location_name: String,
    pub observed_at: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub precipitation_mm: Option<f64>,
}

// ---------------------------------------------------------------------------
// Advisory output
// ---------------------------------------------------------------------------

/// Advisory severity, in ascending order of urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info,
    Aviso,
    Alerta,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Aviso => write!(f, "AVISO"),
            Severity::Alerta => write!(f, "ALERTA"),
        }
    }
}

/// A single advisory message produced by the recommendation engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity, self.message)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Profile of an authenticated user. Authentication itself happens
/// elsewhere; the dashboard only needs the registered name and location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: Option<String>,
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or storing monitoring data.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status: {0}")]
    HttpStatus(u16),

    /// AEMET `estado` 401: the API key was rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// AEMET `estado` 404, or a station unknown to a fixture.
    #[error("Station not found: {0}")]
    StationNotFound(String),

    /// AEMET `estado` 429.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Any other non-200 AEMET `estado`.
    #[error("AEMET API error {status}: {description}")]
    Api { status: u16, description: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No data available for {0}")]
    NoDataAvailable(String),

    #[error("Database error: {0}")]
    Database(#[from] postgres::Error),

    #[error("Database schema missing: {0}")]
    MissingSchema(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
