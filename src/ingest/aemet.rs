//! AEMET OpenData API Client
//!
//! Retrieves conventional observations from Spanish State Meteorological
//! Agency (AEMET) weather stations, and the station inventory used to pick a
//! representative station per province.
//!
//! Every AEMET endpoint answers in two steps: the first request returns a
//! small envelope (`estado`, `descripcion`, `datos`) and the actual payload
//! must then be fetched from the `datos` URL.
//!
//! API Documentation: https://opendata.aemet.es/dist/index.html

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::ingest::{ObservationProvider, decode_text};
use crate::model::{SourceError, StationObservation};

pub const AEMET_BASE_URL: &str = "https://opendata.aemet.es/opendata/api";

// ============================================================================
// AEMET API Response Structures
// ============================================================================

/// First-step response of every AEMET endpoint.
#[derive(Debug, Deserialize)]
pub struct AemetEnvelope {
    pub estado: u16,
    pub descripcion: Option<String>,
    /// URL of the actual payload, present when `estado` is 200.
    pub datos: Option<String>,
}

/// Single conventional observation
#[derive(Debug, Deserialize)]
pub struct AemetObservation {
    pub idema: String,
    pub fint: Option<String>, // end of observation interval, UTC
    pub ubi: Option<String>,  // station location name
    pub ta: Option<f64>,      // air temperature (°C)
    pub hr: Option<f64>,      // relative humidity (%)
    pub prec: Option<f64>,    // precipitation (mm)
}

/// Entry of the climatological station inventory
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryStation {
    pub indicativo: Option<String>,
    pub nombre: Option<String>,
    pub provincia: Option<String>,
    pub latitud: Option<String>,
    pub longitud: Option<String>,
    pub altitud: Option<String>,
    pub indsinop: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

pub struct AemetClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl AemetClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn observation_url(&self, idema: &str) -> String {
        format!(
            "{}/observacion/convencional/datos/estacion/{}",
            self.base_url, idema
        )
    }

    pub fn inventory_url(&self) -> String {
        format!(
            "{}/valores/climatologicos/inventarioestaciones/todasestaciones/",
            self.base_url
        )
    }

    /// Fetch recent conventional observations for a station
    ///
    /// # Parameters
    /// - `idema`: AEMET station identifier (e.g., "3195")
    pub fn fetch_observations(&self, idema: &str) -> Result<Vec<StationObservation>, SourceError> {
        let raw: Vec<AemetObservation> = self.fetch_datos(&self.observation_url(idema), idema)?;
        debug!(idema, count = raw.len(), "AEMET observations received");

        parse_observations(idema, raw)
    }

    /// Fetch the full climatological station inventory
    pub fn fetch_inventory(&self) -> Result<Vec<InventoryStation>, SourceError> {
        let stations: Vec<InventoryStation> = self.fetch_datos(&self.inventory_url(), "inventory")?;
        info!(count = stations.len(), "AEMET station inventory fetched");
        Ok(stations)
    }

    /// Runs both request steps and decodes the payload.
    fn fetch_datos<T: DeserializeOwned>(&self, url: &str, subject: &str) -> Result<T, SourceError> {
        debug!(url, "requesting AEMET data URL");
        let response = self
            .http
            .get(url)
            .query(&[("api_key", self.api_key.as_str())])
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()));
        }

        let envelope: AemetEnvelope = decode_json(&response.bytes()?)?;
        let data_url = check_envelope(envelope, subject)?;

        debug!(data_url = %data_url, "fetching AEMET payload");
        let response = self
            .http
            .get(&data_url)
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()));
        }

        decode_json(&response.bytes()?)
    }
}

impl ObservationProvider for AemetClient {
    fn observations(&self, idema: &str) -> Result<Vec<StationObservation>, SourceError> {
        self.fetch_observations(idema)
    }
}

// ============================================================================
// Response handling
// ============================================================================

/// Maps the envelope `estado` to the payload URL or a typed error.
pub fn check_envelope(envelope: AemetEnvelope, subject: &str) -> Result<String, SourceError> {
    let description = envelope.descripcion.unwrap_or_default();
    match envelope.estado {
        200 => envelope
            .datos
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| SourceError::Parse(format!("envelope for {} has no datos URL", subject))),
        401 => Err(SourceError::Unauthorized(description)),
        404 => Err(SourceError::StationNotFound(subject.to_string())),
        429 => Err(SourceError::RateLimited(description)),
        status => Err(SourceError::Api { status, description }),
    }
}

/// Decodes JSON, retrying as Latin-1 when the body is not valid UTF-8.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SourceError> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(first) => {
            if std::str::from_utf8(bytes).is_ok() {
                return Err(SourceError::Parse(first.to_string()));
            }
            debug!("payload is not UTF-8, retrying as Latin-1");
            serde_json::from_str(&decode_text(bytes)).map_err(|e| SourceError::Parse(e.to_string()))
        }
    }
}

/// Parses `fint` timestamps. AEMET has served all of
/// "2025-05-13T10:00:00+0000", "2025-05-13T10:00:00+00:00" and the naive
/// "2025-05-13T10:00:00" (UTC).
pub fn parse_aemet_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
        })
}

/// Parse a single AEMET observation into our format
/// Parses a station payload, dropping records that fail to parse. Fails with
/// `NoDataAvailable` only when records were returned and none parsed.
pub fn parse_observations(
    idema: &str,
    raw: Vec<AemetObservation>,
) -> Result<Vec<StationObservation>, SourceError> {
    let received = raw.len();
    let parsed: Vec<StationObservation> = raw
        .into_iter()
        .filter_map(|obs| match parse_observation(obs) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(idema, error = %e, "Skipping AEMET observation");
                None
            }
        })
        .collect();

    if received > 0 && parsed.is_empty() {
        return Err(SourceError::NoDataAvailable(idema.to_string()));
    }
    Ok(parsed)
}

pub fn parse_observation(obs: AemetObservation) -> Result<StationObservation, SourceError> {
    let fint = obs
        .fint
        .as_deref()
        .ok_or_else(|| SourceError::Parse(format!("observation for {} has no fint", obs.idema)))?;
    let observed_at = parse_aemet_time(fint)
        .ok_or_else(|| SourceError::Parse(format!("unrecognized fint '{}'", fint)))?;

    Ok(StationObservation {
        location_name: obs.ubi.unwrap_or_else(|| obs.idema.clone()),
        idema: obs.idema,
        observed_at,
        temperature_c: obs.ta,
        relative_humidity: obs.hr,
        precipitation_mm: obs.prec,
    })
}

// ============================================================================
// Tests
// ============================================================================
