//! Dashboard composition.
//!
//! A dashboard view is a pure function of the user profile, the selected
//! region, today's date and the data sources handed in. Nothing is cached
//! between builds. Source failures degrade the affected panel and are
//! logged; they never abort the whole view.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::alert::recommendations::{Evaluation, evaluate_with};
use crate::alert::thresholds::AdvisoryThresholds;
use crate::config::Config;
use crate::ingest::{HistoricalSource, ObservationProvider, SensorSource};
use crate::logging::{self, DataSource};
use crate::model::{HistoricalContext, Month, MonthlyRecord, SensorReading, Severity, UserProfile};
use crate::regions::{RegionDirectory, sanitize_region_id};

pub const NOT_AVAILABLE: &str = "N/A";
pub const SENSOR_ERROR_MESSAGE: &str = "Error loading sensor data.";

/// Number of readings shown in the history charts.
pub const READING_HISTORY_LIMIT: usize = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DashboardError {
    #[error("No region selected and the user has no registered location")]
    MissingRegion,
}

// ---------------------------------------------------------------------------
// Settings and inputs
// ---------------------------------------------------------------------------

/// Which historical statistic serves as the humidity baseline, and the
/// thresholds the recommendation rules use.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub parameter_code: String,
    pub reference_year: i32,
    pub thresholds: AdvisoryThresholds,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            parameter_code: "AD25mm_Provincias".to_string(),
            reference_year: 2020,
            thresholds: AdvisoryThresholds::default(),
        }
    }
}

impl From<&Config> for DashboardSettings {
    fn from(config: &Config) -> Self {
        Self {
            parameter_code: config.historical.parameter_code.clone(),
            reference_year: config.historical.reference_year,
            thresholds: config.thresholds.clone(),
        }
    }
}

/// One dashboard build request.
#[derive(Debug, Clone)]
pub struct DashboardRequest<'a> {
    pub user: &'a UserProfile,
    /// Explicitly selected region. Falls back to the user's location.
    pub region_id: Option<&'a str>,
    /// Date whose calendar month selects the historical baseline.
    pub today: NaiveDate,
    /// A freshly simulated reading to show instead of the stored latest.
    pub simulated: Option<SensorReading>,
}

/// Collaborators used to build a view.
pub struct DashboardSources<'a> {
    pub sensor: &'a mut dyn SensorSource,
    pub history: &'a mut dyn HistoricalSource,
    pub observations: &'a dyn ObservationProvider,
    pub regions: &'a RegionDirectory,
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Orange,
    Green,
    Neutral,
}

/// A line of text with its presentation hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayLine {
    pub text: String,
    pub color: Color,
    pub bold: bool,
}

impl DisplayLine {
    fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
            bold: false,
        }
    }
}

/// Latest reading values, formatted with one decimal or `N/A`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSummary {
    pub temperature: String,
    pub ph: String,
    pub humidity: String,
}

impl SensorSummary {
    pub fn from_reading(reading: Option<&SensorReading>) -> Self {
        let one_decimal = |v: Option<f64>| format_value(v, 1);
        match reading {
            Some(r) => Self {
                temperature: one_decimal(r.temperature()),
                ph: one_decimal(r.ph()),
                humidity: one_decimal(r.humidity()),
            },
            None => Self {
                temperature: NOT_AVAILABLE.to_string(),
                ph: NOT_AVAILABLE.to_string(),
                humidity: NOT_AVAILABLE.to_string(),
            },
        }
    }
}

fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Values of the latest station observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeValues {
    pub idema: String,
    pub station_name: String,
    pub observed_at: String,
    pub temperature: String,
    pub humidity: String,
    pub precipitation: String,
}

/// Real-time weather station panel: a status line, plus values when an
/// observation was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimePanel {
    pub status: DisplayLine,
    pub values: Option<RealtimeValues>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub region_id: String,
    pub region_display: String,
    pub summary: SensorSummary,
    pub recommendations: Vec<DisplayLine>,
    pub realtime: RealtimePanel,
    #[serde(skip)]
    pub evaluation: Option<Evaluation>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Region the dashboard shows: the explicit selection, else the region
/// derived from the user's registered location.
pub fn resolve_region(user: &UserProfile, selected: Option<&str>) -> Result<String, DashboardError> {
    if let Some(id) = selected.map(sanitize_region_id).filter(|s| !s.is_empty()) {
        return Ok(id);
    }
    user.location
        .as_deref()
        .map(sanitize_region_id)
        .filter(|id| !id.is_empty())
        .ok_or(DashboardError::MissingRegion)
}

/// Builds the full dashboard for one request.
///
/// The historical baseline is only looked up when there is a reading. A
/// sensor failure replaces the recommendation panel with a red error line
/// and blanks the summary.
pub fn build_dashboard(
    request: &DashboardRequest<'_>,
    sources: &mut DashboardSources<'_>,
    settings: &DashboardSettings,
) -> Result<DashboardView, DashboardError> {
    let region_id = resolve_region(request.user, request.region_id)?;
    let region_display = sources.regions.display_name(&region_id);
    tracing::debug!(region = %region_id, display = %region_display, "Building dashboard");

    let latest = match &request.simulated {
        Some(reading) => Ok(Some(reading.clone())),
        None => sources.sensor.latest_reading(),
    };

    let (summary, recommendations, evaluation) = match latest {
        Ok(reading) => {
            // A reading without measured values has nothing to compare
            let context = match &reading {
                Some(r) if !r.is_empty() => historical_context(
                    sources.history,
                    &region_id,
                    &region_display,
                    request.today,
                    settings,
                ),
                _ => None,
            };
            let evaluation = evaluate_with(reading.as_ref(), context.as_ref(), &settings.thresholds);
            tracing::debug!(
                region = %region_id,
                status = ?evaluation.status,
                severity = ?evaluation.highest_severity(),
                "Reading evaluated"
            );
            (
                SensorSummary::from_reading(reading.as_ref()),
                recommendation_panel(&evaluation),
                Some(evaluation),
            )
        }
        Err(e) => {
            logging::log_source_failure(DataSource::Sensor, None, "Fetch latest reading", &e);
            (
                SensorSummary::from_reading(None),
                vec![DisplayLine::new(SENSOR_ERROR_MESSAGE, Color::Red)],
                None,
            )
        }
    };

    let realtime = realtime_panel(&region_id, &region_display, sources.regions, sources.observations);

    Ok(DashboardView {
        title: format!("Dashboard: {} - Soil Monitor", region_display),
        region_id,
        region_display,
        summary,
        recommendations,
        realtime,
        evaluation,
    })
}

/// Baseline for the current calendar month, or `None` when the record or
/// the month's value is missing or the lookup fails.
fn historical_context(
    history: &mut dyn HistoricalSource,
    region_id: &str,
    region_display: &str,
    today: NaiveDate,
    settings: &DashboardSettings,
) -> Option<HistoricalContext> {
    let month = Month::of(&today);
    match history.monthly_record(region_id, &settings.parameter_code, settings.reference_year) {
        Ok(Some(record)) => record.context_for(month, region_display),
        Ok(None) => {
            tracing::debug!(
                region = region_id,
                parameter = %settings.parameter_code,
                year = settings.reference_year,
                "No historical record"
            );
            None
        }
        Err(e) => {
            logging::log_source_failure(DataSource::Database, Some(region_id), "Fetch historical record", &e);
            None
        }
    }
}

/// Recommendation panel lines. A blanket message replaces the itemized
/// list when the evaluation has one; otherwise ALERTA lines are red and
/// bold, AVISO orange and INFO green.
pub fn recommendation_panel(evaluation: &Evaluation) -> Vec<DisplayLine> {
    if let Some(message) = evaluation.summary_message() {
        return vec![DisplayLine::new(message, Color::Neutral)];
    }

    evaluation
        .recommendations
        .iter()
        .map(|rec| {
            let (color, bold) = match rec.severity {
                Severity::Alerta => (Color::Red, true),
                Severity::Aviso => (Color::Orange, false),
                Severity::Info => (Color::Green, false),
            };
            DisplayLine {
                text: rec.to_string(),
                color,
                bold,
            }
        })
        .collect()
}

/// Real-time observation panel for a region.
pub fn realtime_panel(
    region_id: &str,
    region_display: &str,
    regions: &RegionDirectory,
    observations: &dyn ObservationProvider,
) -> RealtimePanel {
    let Some(idema) = regions.idema_for(region_id) else {
        return RealtimePanel {
            status: DisplayLine::new(
                format!("No AEMET station configured for {}.", region_display),
                Color::Red,
            ),
            values: None,
        };
    };

    match observations.latest_observation(idema) {
        Ok(obs) => {
            let station_name = if obs.location_name.trim().is_empty() {
                region_display.to_string()
            } else {
                obs.location_name.clone()
            };
            RealtimePanel {
                status: DisplayLine::new(format!("Observation for {}", station_name), Color::Green),
                values: Some(RealtimeValues {
                    idema: obs.idema.clone(),
                    station_name,
                    observed_at: obs.observed_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                    temperature: format_value(obs.temperature_c, 1),
                    humidity: format_value(obs.relative_humidity, 0),
                    precipitation: format_value(obs.precipitation_mm, 1),
                }),
            }
        }
        Err(e) => {
            logging::log_source_failure(DataSource::Aemet, Some(idema), "Fetch latest observation", &e);
            RealtimePanel {
                status: DisplayLine::new(format!("Error or no data for IDEMA {}. {}", idema, e), Color::Red),
                values: None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Chart series
// ---------------------------------------------------------------------------

/// A labelled series of points; `None` marks a gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub x_labels: Vec<String>,
    pub values: Vec<Option<f64>>,
}

/// Twelve monthly bars in calendar order, labelled "Enero" … "Diciembre".
pub fn historical_chart(record: &MonthlyRecord) -> ChartSeries {
    ChartSeries {
        label: format!("{} ({})", record.parameter_code, record.year),
        x_labels: Month::ALL.iter().map(|m| m.label()).collect(),
        values: Month::ALL.iter().map(|&m| record.value_for(m)).collect(),
    }
}

/// Temperature, pH and humidity series over a reading history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingCharts {
    pub temperature: ChartSeries,
    pub ph: ChartSeries,
    pub humidity: ChartSeries,
}

/// Builds the reading history charts. `readings` is expected oldest first;
/// readings without a timestamp are labelled `N/A`.
pub fn reading_series(readings: &[SensorReading]) -> ReadingCharts {
    let x_labels: Vec<String> = readings
        .iter()
        .map(|r| match r.timestamp() {
            Some(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
            None => NOT_AVAILABLE.to_string(),
        })
        .collect();

    let series = |label: &str, value: fn(&SensorReading) -> Option<f64>| ChartSeries {
        label: label.to_string(),
        x_labels: x_labels.clone(),
        values: readings.iter().map(value).collect(),
    };

    ReadingCharts {
        temperature: series("Temperatura (°C)", SensorReading::temperature),
        ph: series("pH", SensorReading::ph),
        humidity: series("Humedad (%)", SensorReading::humidity),
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f)?;
        writeln!(f, "Latest reading")?;
        writeln!(f, "  Temperature (°C): {}", self.summary.temperature)?;
        writeln!(f, "  pH:               {}", self.summary.ph)?;
        writeln!(f, "  Humidity (%):     {}", self.summary.humidity)?;
        writeln!(f)?;
        writeln!(f, "Recommendations")?;
        for line in &self.recommendations {
            writeln!(f, "  {}", line.text)?;
        }
        writeln!(f)?;
        writeln!(f, "Weather station")?;
        writeln!(f, "  {}", self.realtime.status.text)?;
        if let Some(values) = &self.realtime.values {
            writeln!(f, "  Station:            {} ({})", values.station_name, values.idema)?;
            writeln!(f, "  Observed:           {}", values.observed_at)?;
            writeln!(f, "  Temperature (°C):   {}", values.temperature)?;
            writeln!(f, "  Humidity (%):       {}", values.humidity)?;
            writeln!(f, "  Precipitation (mm): {}", values.precipitation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::recommendations::{ALL_CLEAR_MESSAGE, EvaluationStatus, NO_DATA_MESSAGE};
    use crate::ingest::fixture::{FixtureObservations, InMemoryHistory, InMemoryReadings, demo_history};
    use crate::model::{Recommendation, SourceError};
    use crate::regions::StationMapping;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn may_13() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 13).unwrap()
    }

    fn record(region: &str, may: Option<f64>) -> MonthlyRecord {
        let mut monthly_values = BTreeMap::new();
        monthly_values.insert(Month::May, may);
        MonthlyRecord {
            region_id: region.to_string(),
            region_original: "Madrid (Comunidad de)".to_string(),
            parameter_code: "AD25mm_Provincias".to_string(),
            parameter_description: String::new(),
            year: 2020,
            monthly_values,
            source_file: String::new(),
        }
    }

    struct FailingHistory;

    impl HistoricalSource for FailingHistory {
        fn monthly_record(&mut self, _: &str, _: &str, _: i32) -> Result<Option<MonthlyRecord>, SourceError> {
            Err(SourceError::HttpStatus(500))
        }

        fn regions(&mut self) -> Result<Vec<crate::regions::RegionInfo>, SourceError> {
            Err(SourceError::HttpStatus(500))
        }
    }

    /// History that fails the test if it is ever asked for a record.
    struct UntouchableHistory;

    impl HistoricalSource for UntouchableHistory {
        fn monthly_record(&mut self, _: &str, _: &str, _: i32) -> Result<Option<MonthlyRecord>, SourceError> {
            panic!("history must not be queried without a reading");
        }

        fn regions(&mut self) -> Result<Vec<crate::regions::RegionInfo>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn build(
        sensor: &mut dyn SensorSource,
        history: &mut dyn HistoricalSource,
        region: Option<&str>,
        user: &UserProfile,
    ) -> DashboardView {
        let now = Utc.with_ymd_and_hms(2025, 5, 13, 12, 0, 0).unwrap();
        let observations = FixtureObservations::new(now);
        let regions = RegionDirectory::builtin();
        let request = DashboardRequest {
            user,
            region_id: region,
            today: may_13(),
            simulated: None,
        };
        let mut sources = DashboardSources {
            sensor,
            history,
            observations: &observations,
            regions: &regions,
        };
        build_dashboard(&request, &mut sources, &DashboardSettings::default()).expect("region resolves")
    }

    #[test]
    fn test_resolve_region_prefers_selection() {
        let user = UserProfile {
            username: None,
            location: Some("Santa Cruz de Tenerife".into()),
        };
        assert_eq!(resolve_region(&user, Some("MADRID")).unwrap(), "MADRID");
        assert_eq!(resolve_region(&user, None).unwrap(), "SANTA CRUZ DE TENERIFE");
        assert_eq!(resolve_region(&user, Some("  ")).unwrap(), "SANTA CRUZ DE TENERIFE");
        assert_eq!(
            resolve_region(&UserProfile::default(), None),
            Err(DashboardError::MissingRegion)
        );
    }

    #[test]
    fn test_no_reading_shows_no_data_and_skips_history() {
        let mut sensor = InMemoryReadings::default();
        let view = build(&mut sensor, &mut UntouchableHistory, Some("MADRID"), &UserProfile::default());

        assert_eq!(view.summary, SensorSummary::from_reading(None));
        assert_eq!(view.recommendations, vec![DisplayLine::new(NO_DATA_MESSAGE, Color::Neutral)]);
        assert_eq!(
            view.evaluation.as_ref().map(|e| e.status),
            Some(EvaluationStatus::NoData)
        );
    }

    #[test]
    fn test_reading_without_values_skips_history() {
        let mut sensor = InMemoryReadings::new(vec![SensorReading::new()]);
        let view = build(&mut sensor, &mut UntouchableHistory, Some("MADRID"), &UserProfile::default());

        assert_eq!(
            view.evaluation.as_ref().map(|e| e.status),
            Some(EvaluationStatus::NoSpecificRecommendations)
        );
    }

    #[test]
    fn test_sensor_failure_shows_red_error_line() {
        let mut sensor = InMemoryReadings::unavailable();
        let view = build(&mut sensor, &mut UntouchableHistory, Some("MADRID"), &UserProfile::default());

        assert_eq!(view.recommendations.len(), 1);
        assert_eq!(view.recommendations[0].text, SENSOR_ERROR_MESSAGE);
        assert_eq!(view.recommendations[0].color, Color::Red);
        assert_eq!(view.summary.temperature, NOT_AVAILABLE);
        assert!(view.evaluation.is_none());
        // Weather panel is independent of the sensor
        assert!(view.realtime.values.is_some());
    }

    #[test]
    fn test_all_info_is_replaced_by_blanket_message() {
        let mut sensor = InMemoryReadings::new(vec![
            SensorReading::new().with_ph(6.5).with_humidity(50.0).with_temperature(20.0),
        ]);
        let mut history = InMemoryHistory::new(vec![record("MADRID", Some(50.0))]);
        let view = build(&mut sensor, &mut history, Some("MADRID"), &UserProfile::default());

        assert_eq!(view.recommendations, vec![DisplayLine::new(ALL_CLEAR_MESSAGE, Color::Neutral)]);
        let evaluation = view.evaluation.expect("evaluated");
        assert_eq!(evaluation.status, EvaluationStatus::AllClear);
        assert_eq!(evaluation.recommendations.len(), 3);
        assert_eq!(view.summary.ph, "6.5");
    }

    #[test]
    fn test_history_for_current_month_feeds_humidity_rule() {
        let mut sensor = InMemoryReadings::new(vec![SensorReading::new().with_humidity(50.0)]);
        let mut history = InMemoryHistory::new(vec![record("MADRID", Some(100.0))]);
        let view = build(&mut sensor, &mut history, Some("MADRID"), &UserProfile::default());

        assert_eq!(view.recommendations.len(), 1);
        let line = &view.recommendations[0];
        assert_eq!(line.color, Color::Red);
        assert!(line.bold);
        assert!(line.text.starts_with("ALERTA"));
        assert!(line.text.contains("Historical average for May in Madrid: 100.0%"));
        assert!(line.text.contains("much drier than average"));
    }

    #[test]
    fn test_missing_month_value_means_no_history() {
        let mut sensor = InMemoryReadings::new(vec![SensorReading::new().with_humidity(50.0)]);
        let mut history = InMemoryHistory::new(vec![record("MADRID", None)]);
        let view = build(&mut sensor, &mut history, Some("MADRID"), &UserProfile::default());
        assert_eq!(view.recommendations[0].text, ALL_CLEAR_MESSAGE);
    }

    #[test]
    fn test_history_failure_degrades_to_no_context() {
        let mut sensor = InMemoryReadings::new(vec![SensorReading::new().with_humidity(20.0)]);
        let view = build(&mut sensor, &mut FailingHistory, Some("MADRID"), &UserProfile::default());

        assert_eq!(view.recommendations.len(), 1);
        assert!(view.recommendations[0].text.contains("urgent irrigation"));
        assert!(!view.recommendations[0].text.contains("Historical average"));
    }

    #[test]
    fn test_simulated_reading_overrides_store() {
        let now = Utc.with_ymd_and_hms(2025, 5, 13, 12, 0, 0).unwrap();
        let mut sensor = InMemoryReadings::unavailable();
        let mut history = demo_history();
        let observations = FixtureObservations::new(now);
        let regions = RegionDirectory::builtin();
        let user = UserProfile::default();
        let request = DashboardRequest {
            user: &user,
            region_id: Some("VALLADOLID"),
            today: may_13(),
            simulated: Some(SensorReading::new().with_temperature(40.0).with_timestamp(now)),
        };
        let mut sources = DashboardSources {
            sensor: &mut sensor,
            history: &mut history,
            observations: &observations,
            regions: &regions,
        };

        let view = build_dashboard(&request, &mut sources, &DashboardSettings::default()).unwrap();
        assert_eq!(view.summary.temperature, "40.0");
        assert_eq!(view.recommendations[0].color, Color::Red);
        assert_eq!(view.title, "Dashboard: VALLADOLID - Soil Monitor");
    }

    #[test]
    fn test_recommendation_colors() {
        let evaluation = Evaluation {
            status: EvaluationStatus::Advisories,
            recommendations: vec![
                Recommendation {
                    severity: Severity::Info,
                    message: "a".into(),
                },
                Recommendation {
                    severity: Severity::Aviso,
                    message: "b".into(),
                },
            ],
            has_issue: false,
        };
        let lines = recommendation_panel(&evaluation);
        assert_eq!(lines[0].color, Color::Green);
        assert_eq!(lines[0].text, "INFO a");
        assert_eq!(lines[1].color, Color::Orange);
        assert!(!lines[1].bold);
    }

    #[test]
    fn test_realtime_panel_formats_latest_observation() {
        let now = Utc.with_ymd_and_hms(2025, 5, 13, 12, 0, 0).unwrap();
        let observations = FixtureObservations::new(now);
        let regions = RegionDirectory::builtin();

        let panel = realtime_panel("VALLADOLID", "VALLADOLID", &regions, &observations);
        assert_eq!(panel.status.color, Color::Green);
        let values = panel.values.expect("observation");
        assert_eq!(values.idema, "2517A");
        assert_eq!(values.temperature, "15.4");
        assert_eq!(values.humidity, "48");
        assert_eq!(values.precipitation, "0.0");
        assert_eq!(values.observed_at, "2025-05-13 10:00 UTC");
    }

    #[test]
    fn test_realtime_panel_without_station_or_with_failure() {
        let now = Utc.with_ymd_and_hms(2025, 5, 13, 12, 0, 0).unwrap();
        let observations = FixtureObservations::new(now);

        let panel = realtime_panel("TERUEL", "TERUEL", &RegionDirectory::builtin(), &observations);
        assert_eq!(panel.status.text, "No AEMET station configured for TERUEL.");
        assert_eq!(panel.status.color, Color::Red);

        let regions = RegionDirectory::from_mappings(vec![StationMapping {
            region_id: "BROKEN".into(),
            provincia: "BROKEN".into(),
            idema: "9999X_FAIL".into(),
            station_name: "nowhere".into(),
            latitude: None,
            longitude: None,
            altitude: None,
        }]);
        let panel = realtime_panel("BROKEN", "BROKEN", &regions, &observations);
        assert_eq!(panel.status.color, Color::Red);
        assert!(panel.status.text.starts_with("Error or no data for IDEMA 9999X_FAIL."));
        assert!(panel.values.is_none());
    }

    #[test]
    fn test_historical_chart_has_twelve_months() {
        let chart = historical_chart(&record("MADRID", Some(42.0)));
        assert_eq!(chart.label, "AD25mm_Provincias (2020)");
        assert_eq!(chart.x_labels.len(), 12);
        assert_eq!(chart.x_labels[0], "Enero");
        assert_eq!(chart.values[4], Some(42.0));
        assert_eq!(chart.values[0], None);
    }

    #[test]
    fn test_reading_series() {
        let at = Utc.with_ymd_and_hms(2025, 5, 13, 9, 30, 0).unwrap();
        let charts = reading_series(&[
            SensorReading::new().with_temperature(20.0).with_timestamp(at),
            SensorReading::new().with_ph(6.1),
        ]);
        assert_eq!(charts.temperature.x_labels, vec!["2025-05-13 09:30", NOT_AVAILABLE]);
        assert_eq!(charts.temperature.values, vec![Some(20.0), None]);
        assert_eq!(charts.ph.values, vec![None, Some(6.1)]);
        assert_eq!(charts.humidity.label, "Humedad (%)");
    }

    #[test]
    fn test_view_renders_as_text() {
        let mut sensor = InMemoryReadings::new(vec![SensorReading::new().with_ph(4.0)]);
        let view = build(&mut sensor, &mut demo_history(), Some("MADRID"), &UserProfile::default());
        let text = view.to_string();
        assert!(text.starts_with("Dashboard: MADRID - Soil Monitor"));
        assert!(text.contains("ALERTA pH (4.0) too low (acidic), consider liming."));
        assert!(text.contains("Station:"));
    }
}
