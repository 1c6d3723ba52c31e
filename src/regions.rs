//! Region registry for the soil monitoring dashboard.
//!
//! Defines how regions are identified, which AEMET weather station
//! represents each province, and how regions are offered to the user in the
//! region selector. Region identifiers are sanitized region names (see
//! `sanitize_region_id`); every other module should go through this module
//! rather than building identifiers by hand.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ingest::aemet::InventoryStation;
use crate::model::UserProfile;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Turns a region name into the canonical region identifier.
///
/// Surrounding whitespace is trimmed, `/` becomes `_`, `.` is removed and
/// the result is upper-cased: "Araba/Álava" → "ARABA_ÁLAVA",
/// "Sta. Cruz de Tenerife" → "STA CRUZ DE TENERIFE". Inner spaces are kept,
/// so ids written by the AEMET upload scripts ("A CORUÑA") still match.
/// Upper-casing is what lets CSV regions ("Valladolid"), station-map
/// provinces ("VALLADOLID") and free-text user locations share one id.
pub fn sanitize_region_id(name: &str) -> String {
    name.trim().replace('/', "_").replace('.', "").trim().to_uppercase()
}

/// Human-readable fallback for an identifier: underscores become spaces.
pub fn id_to_display(region_id: &str) -> String {
    region_id.replace('_', " ")
}

// ---------------------------------------------------------------------------
// Province → weather station map
// ---------------------------------------------------------------------------

/// Built-in metadata for the AEMET station representing a province.
pub struct ProvinceStation {
    /// Sanitized province identifier.
    pub region_id: &'static str,
    /// Province name as published by AEMET.
    pub provincia: &'static str,
    /// AEMET station identifier (IDEMA / indicativo).
    pub idema: &'static str,
    /// Official station name.
    pub name: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
}

/// Provinces with a representative AEMET station, used when no station map
/// has been synchronized into the store yet.
pub static PROVINCE_STATIONS: &[ProvinceStation] = &[
    ProvinceStation {
        region_id: "A CORUÑA",
        provincia: "A CORUÑA",
        idema: "1387",
        name: "A CORUÑA",
        latitude: 43.3658,
        longitude: -8.4214,
    },
    ProvinceStation {
        region_id: "ALBACETE",
        provincia: "ALBACETE",
        idema: "8175",
        name: "ALBACETE BASE AÉREA",
        latitude: 38.9525,
        longitude: -1.8631,
    },
    ProvinceStation {
        region_id: "BARCELONA",
        provincia: "BARCELONA",
        idema: "0076",
        name: "BARCELONA AEROPUERTO",
        latitude: 41.2928,
        longitude: 2.0700,
    },
    ProvinceStation {
        region_id: "MADRID",
        provincia: "MADRID",
        idema: "3195",
        name: "MADRID, RETIRO",
        latitude: 40.4117,
        longitude: -3.6781,
    },
    ProvinceStation {
        region_id: "SEVILLA",
        provincia: "SEVILLA",
        idema: "5783",
        name: "SEVILLA AEROPUERTO",
        latitude: 37.4167,
        longitude: -5.8792,
    },
    ProvinceStation {
        region_id: "VALENCIA",
        provincia: "VALENCIA",
        idema: "8416",
        name: "VALÈNCIA",
        latitude: 39.4806,
        longitude: -0.3664,
    },
    ProvinceStation {
        region_id: "VALLADOLID",
        provincia: "VALLADOLID",
        idema: "2517A",
        name: "FUENTE EL SOL",
        latitude: 41.1781,
        longitude: -4.9372,
    },
    ProvinceStation {
        region_id: "ZARAGOZA",
        provincia: "ZARAGOZA",
        idema: "9434",
        name: "ZARAGOZA AEROPUERTO",
        latitude: 41.6606,
        longitude: -1.0042,
    },
];

/// Owned station map entry, as synchronized from the AEMET inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMapping {
    pub region_id: String,
    pub provincia: String,
    pub idema: String,
    pub station_name: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub altitude: Option<String>,
}

impl From<&ProvinceStation> for StationMapping {
    fn from(s: &ProvinceStation) -> Self {
        Self {
            region_id: s.region_id.to_string(),
            provincia: s.provincia.to_string(),
            idema: s.idema.to_string(),
            station_name: s.name.to_string(),
            latitude: Some(s.latitude.to_string()),
            longitude: Some(s.longitude.to_string()),
            altitude: None,
        }
    }
}

/// Picks one representative station per province from the AEMET station
/// inventory: the first listed station whose province, id and name are all
/// present. Provinces are compared upper-cased; provinces whose identifier
/// would be empty after sanitizing are skipped. Sorted by region id.
pub fn select_one_station_per_province(inventory: &[InventoryStation]) -> Vec<StationMapping> {
    let mut selected: BTreeMap<String, StationMapping> = BTreeMap::new();

    for station in inventory {
        let province = station.provincia.as_deref().unwrap_or_default().trim().to_uppercase();
        if province.is_empty() {
            continue;
        }
        let region_id = sanitize_region_id(&province);
        if region_id.is_empty() || selected.contains_key(&region_id) {
            continue;
        }
        let (Some(idema), Some(name)) = (non_blank(&station.indicativo), non_blank(&station.nombre))
        else {
            continue;
        };
        selected.insert(
            region_id.clone(),
            StationMapping {
                region_id,
                provincia: province,
                idema: idema.to_string(),
                station_name: name.to_string(),
                latitude: station.latitud.clone(),
                longitude: station.longitud.clone(),
                altitude: station.altitud.clone(),
            },
        );
    }

    selected.into_values().collect()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Lookup over a province → station map.
#[derive(Debug, Clone, Default)]
pub struct RegionDirectory {
    stations: Vec<StationMapping>,
}

impl RegionDirectory {
    /// Directory backed by `PROVINCE_STATIONS`.
    pub fn builtin() -> Self {
        Self::from_mappings(PROVINCE_STATIONS.iter().map(StationMapping::from).collect())
    }

    pub fn from_mappings(stations: Vec<StationMapping>) -> Self {
        Self { stations }
    }

    /// Looks up the station mapped to a region. Returns `None` if not found.
    pub fn find_station(&self, region_id: &str) -> Option<&StationMapping> {
        let wanted = sanitize_region_id(region_id);
        self.stations.iter().find(|s| sanitize_region_id(&s.region_id) == wanted)
    }

    /// IDEMA of the station representing a region.
    pub fn idema_for(&self, region_id: &str) -> Option<&str> {
        self.find_station(region_id).map(|s| s.idema.as_str())
    }

    /// Display name for a region: the mapped province name when there is
    /// one, otherwise the identifier with underscores turned into spaces.
    pub fn display_name(&self, region_id: &str) -> String {
        match self.find_station(region_id) {
            Some(s) if !s.provincia.trim().is_empty() => s.provincia.clone(),
            _ => id_to_display(region_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Region selector
// ---------------------------------------------------------------------------

/// Aggregation level of a region in the historical data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    Provincia,
    ComunidadesAutonomas,
    GrandesCuencas,
    Nacional,
    Unknown,
}

impl RegionKind {
    /// Order in which groups appear in the region selector.
    pub const DISPLAY_ORDER: [RegionKind; 5] = [
        RegionKind::Provincia,
        RegionKind::ComunidadesAutonomas,
        RegionKind::GrandesCuencas,
        RegionKind::Nacional,
        RegionKind::Unknown,
    ];

    /// Derives the kind from a parameter code's aggregation suffix
    /// (`AD25mm_Provincias` → `Provincia`).
    pub fn from_parameter_code(code: &str) -> RegionKind {
        if code.ends_with("_Provincias") {
            RegionKind::Provincia
        } else if code.ends_with("_ComunidadesAutonomas") {
            RegionKind::ComunidadesAutonomas
        } else if code.ends_with("_GrandesCuencas") {
            RegionKind::GrandesCuencas
        } else if code.ends_with("_Nacional") {
            RegionKind::Nacional
        } else {
            RegionKind::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RegionKind::Provincia => "Provincia",
            RegionKind::ComunidadesAutonomas => "ComunidadesAutonomas",
            RegionKind::GrandesCuencas => "GrandesCuencas",
            RegionKind::Nacional => "Nacional",
            RegionKind::Unknown => "Unknown",
        }
    }
}

/// A selectable region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub id: String,
    pub kind: RegionKind,
}

/// One labelled group of the region selector.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGroup<'a> {
    pub kind: RegionKind,
    pub regions: Vec<&'a RegionInfo>,
}

/// Groups regions by kind in `RegionKind::DISPLAY_ORDER`, each group sorted
/// by identifier ignoring case. Empty groups are left out.
pub fn group_for_selector(regions: &[RegionInfo]) -> Vec<RegionGroup<'_>> {
    RegionKind::DISPLAY_ORDER
        .iter()
        .filter_map(|&kind| {
            let mut members: Vec<&RegionInfo> = regions.iter().filter(|r| r.kind == kind).collect();
            if members.is_empty() {
                return None;
            }
            members.sort_by_key(|r| r.id.to_lowercase());
            Some(RegionGroup {
                kind,
                regions: members,
            })
        })
        .collect()
}

/// The region to preselect for a user: their registered location, when it
/// matches a known region identifier.
pub fn preselect_region<'a>(user: &UserProfile, regions: &'a [RegionInfo]) -> Option<&'a RegionInfo> {
    let location = user.location.as_deref()?.trim();
    if location.is_empty() {
        return None;
    }
    let wanted = sanitize_region_id(location);
    regions.iter().find(|r| sanitize_region_id(&r.id) == wanted)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
