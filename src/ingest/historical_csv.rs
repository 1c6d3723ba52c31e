//! AEMET annual water-balance statistics ("estadística anual del balance
//! hídrico") CSV import.
//!
//! Files are named `<PREFIX>_<YEAR>_<Aggregation>.csv` and live in one
//! folder per year, `ebh_estadistica_anual_<YEAR>`. Each file is
//! semicolon-separated with a header row: parameter description, region,
//! then one column per month (plus an `anual` column that is ignored).
//! Values use a decimal comma.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::ingest::decode_text;
use crate::model::{Month, MonthlyRecord, SourceError};
use crate::regions::sanitize_region_id;

pub const YEAR_FOLDER_PREFIX: &str = "ebh_estadistica_anual_";

/// Aggregation suffixes in the order they are matched against a file name.
const AGGREGATIONS: [&str; 4] = ["Provincias", "GrandesCuencas", "ComunidadesAutonomas", "Nacional"];

/// Aggregations that carry one row per region and are worth importing.
const REGIONAL_AGGREGATIONS: [&str; 3] = ["Provincias", "GrandesCuencas", "ComunidadesAutonomas"];

// ============================================================================
// File names and parameter codes
// ============================================================================

/// Components of a statistics file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsFileName {
    pub prefix: String,
    pub year: i32,
    /// Everything after the year, without the extension ("Provincias").
    pub suffix: String,
}

/// Splits `AD25_2019_Provincias.csv` into prefix, year and suffix.
pub fn parse_file_name(file_name: &str) -> Option<StatisticsFileName> {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    let mut parts = stem.splitn(3, '_');
    let prefix = parts.next().filter(|p| !p.is_empty())?;
    let year = parts.next()?.parse::<i32>().ok()?;
    let suffix = parts.next().filter(|s| !s.is_empty())?;

    Some(StatisticsFileName {
        prefix: prefix.to_string(),
        year,
        suffix: suffix.to_string(),
    })
}

/// Parameter code for a file prefix and aggregation suffix, e.g.
/// (`AD25`, `Provincias`) → `AD25mm_Provincias`.
///
/// Returns `None` for an unknown prefix. An unknown suffix yields the bare
/// parameter code.
pub fn parameter_code(prefix: &str, suffix: &str) -> Option<String> {
    let base = match prefix.to_uppercase().as_str() {
        "AD25" => "AD25mm",
        "AD75" => "AD75mm",
        "PADMAX" => "ADRmax",
        "ETO" => "ETo",
        "PREC" => "Precipitacion",
        _ => return None,
    };

    match AGGREGATIONS.iter().find(|agg| suffix.contains(*agg)) {
        Some(agg) => Some(format!("{}_{}", base, agg)),
        None => Some(base.to_string()),
    }
}

/// True when a parameter code refers to a per-region aggregation.
pub fn is_regional(parameter_code: &str) -> bool {
    REGIONAL_AGGREGATIONS
        .iter()
        .any(|agg| parameter_code.ends_with(&format!("_{}", agg)))
}

// ============================================================================
// CSV parsing
// ============================================================================

/// Records parsed from one file, plus the number of rows dropped.
#[derive(Debug, Default)]
pub struct ParsedStatistics {
    pub records: Vec<MonthlyRecord>,
    pub skipped_rows: usize,
}

/// Parses the contents of a statistics CSV.
///
/// Rows with an empty region or without a single parseable month value are
/// skipped. Unparseable month cells are kept as `None`.
pub fn parse_statistics_csv(
    text: &str,
    parameter_code: &str,
    year: i32,
    source_file: &str,
) -> Result<ParsedStatistics, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.len() < 3 {
        return Err(SourceError::Parse(format!(
            "{}: expected at least 3 columns, found {}",
            source_file,
            headers.len()
        )));
    }

    let month_columns: Vec<(usize, Month)> = headers
        .iter()
        .enumerate()
        .skip(2)
        .filter_map(|(idx, name)| Month::from_key(name).map(|m| (idx, m)))
        .collect();
    if month_columns.is_empty() {
        return Err(SourceError::Parse(format!(
            "{}: no month columns in header",
            source_file
        )));
    }

    let mut parsed = ParsedStatistics::default();
    for row in reader.records() {
        let row = row?;
        let region_original = row.get(1).map(str::trim).unwrap_or("");
        let region_id = sanitize_region_id(region_original);
        if region_id.is_empty() {
            parsed.skipped_rows += 1;
            continue;
        }

        let monthly_values: BTreeMap<Month, Option<f64>> = month_columns
            .iter()
            .map(|&(idx, month)| (month, row.get(idx).and_then(parse_decimal)))
            .collect();
        if monthly_values.values().all(Option::is_none) {
            debug!(region = region_original, file = source_file, "Row has no month values");
            parsed.skipped_rows += 1;
            continue;
        }

        parsed.records.push(MonthlyRecord {
            region_id,
            region_original: region_original.to_string(),
            parameter_code: parameter_code.to_string(),
            parameter_description: row.get(0).map(str::trim).unwrap_or("").to_string(),
            year,
            monthly_values,
            source_file: source_file.to_string(),
        });
    }

    Ok(parsed)
}

/// Parses a decimal-comma number; blank or invalid cells are `None`.
fn parse_decimal(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

// ============================================================================
// Files and folders
// ============================================================================

/// Totals for one import run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub files_imported: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub records: usize,
    pub skipped_rows: usize,
}

/// Imports one file. Returns `Ok(None)` when the file name does not
/// describe a regional statistics file for `year`.
pub fn import_file(path: &Path, year: i32) -> Result<Option<ParsedStatistics>, SourceError> {
    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return Ok(None),
    };

    let parsed_name = match parse_file_name(file_name) {
        Some(parsed) if parsed.year == year => parsed,
        _ => {
            debug!(file = file_name, year, "Not a statistics file for this year");
            return Ok(None);
        }
    };

    let code = match parameter_code(&parsed_name.prefix, &parsed_name.suffix) {
        Some(code) if is_regional(&code) => code,
        Some(code) => {
            debug!(file = file_name, parameter = %code, "Skipping non-regional aggregation");
            return Ok(None);
        }
        None => {
            warn!(file = file_name, prefix = %parsed_name.prefix, "Unrecognised parameter prefix");
            return Ok(None);
        }
    };

    let bytes = fs::read(path)?;
    let text = decode_text(&bytes);
    parse_statistics_csv(&text, &code, year, file_name).map(Some)
}

/// Year encoded in a folder name such as `ebh_estadistica_anual_2019`.
pub fn year_of_folder(folder_name: &str) -> Option<i32> {
    folder_name
        .strip_prefix(YEAR_FOLDER_PREFIX)?
        .parse::<i32>()
        .ok()
}

/// Walks every year folder under `root` and parses every applicable CSV.
///
/// A file that fails to parse is logged and counted, it does not abort the
/// run. Folders and files are visited in name order.
pub fn import_directory(root: &Path) -> Result<(Vec<MonthlyRecord>, ImportSummary), SourceError> {
    let mut records = Vec::new();
    let mut summary = ImportSummary::default();

    for folder in sorted_entries(root)? {
        let year = match folder
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(year_of_folder)
        {
            Some(year) if folder.is_dir() => year,
            _ => continue,
        };
        info!(folder = %folder.display(), year, "Processing year folder");

        for file in sorted_entries(&folder)? {
            if file.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            match import_file(&file, year) {
                Ok(Some(parsed)) => {
                    summary.files_imported += 1;
                    summary.records += parsed.records.len();
                    summary.skipped_rows += parsed.skipped_rows;
                    records.extend(parsed.records);
                }
                Ok(None) => summary.files_skipped += 1,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Failed to import statistics file");
                    summary.files_failed += 1;
                }
            }
        }
    }

    Ok((records, summary))
}

fn sorted_entries(dir: &Path) -> Result<Vec<std::path::PathBuf>, SourceError> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}
