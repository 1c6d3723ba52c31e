//! Rule-based soil recommendations.
//!
//! Turns the latest sensor reading, plus an optional historical monthly
//! humidity average, into an ordered list of advisory messages. Messages are
//! always emitted in the order pH, humidity, temperature, and only for the
//! fields present in the reading.
//!
//! Evaluation is a pure function of its inputs: no I/O, no clock, no shared
//! state. A missing or malformed field skips its rule and never aborts the
//! others.

use crate::alert::thresholds::AdvisoryThresholds;
use crate::model::{HistoricalContext, Recommendation, SensorReading, Severity};

pub const NO_DATA_MESSAGE: &str = "No sensor data available to generate recommendations.";
pub const NO_SPECIFIC_MESSAGE: &str = "No specific recommendations based on the current data.";
pub const ALL_CLEAR_MESSAGE: &str = "Soil conditions look fine, keep monitoring.";

/// Overall classification of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStatus {
    /// No reading was supplied at all.
    NoData,
    /// A reading was supplied but none of its fields were usable.
    NoSpecificRecommendations,
    /// Every message is INFO and no issue was raised. Consumers show
    /// `ALL_CLEAR_MESSAGE` in place of the itemized list.
    AllClear,
    /// At least one message needs attention.
    Advisories,
}

/// Result of evaluating one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub status: EvaluationStatus,
    pub recommendations: Vec<Recommendation>,
    pub has_issue: bool,
}

impl Evaluation {
    fn no_data() -> Self {
        Self {
            status: EvaluationStatus::NoData,
            recommendations: Vec::new(),
            has_issue: false,
        }
    }

    /// Blanket message that replaces the itemized list, if any.
    pub fn summary_message(&self) -> Option<&'static str> {
        match self.status {
            EvaluationStatus::NoData => Some(NO_DATA_MESSAGE),
            EvaluationStatus::NoSpecificRecommendations => Some(NO_SPECIFIC_MESSAGE),
            EvaluationStatus::AllClear => Some(ALL_CLEAR_MESSAGE),
            EvaluationStatus::Advisories => None,
        }
    }

    /// Most urgent severity among the emitted messages.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.recommendations.iter().map(|r| r.severity).max()
    }
}

/// Evaluates a reading against the default thresholds.
pub fn evaluate(
    reading: Option<&SensorReading>,
    history: Option<&HistoricalContext>,
) -> Evaluation {
    evaluate_with(reading, history, &AdvisoryThresholds::default())
}

/// Evaluates a reading against explicit thresholds.
pub fn evaluate_with(
    reading: Option<&SensorReading>,
    history: Option<&HistoricalContext>,
    thresholds: &AdvisoryThresholds,
) -> Evaluation {
    let Some(reading) = reading else {
        return Evaluation::no_data();
    };

    let mut recommendations = Vec::with_capacity(3);
    let mut has_issue = false;

    if let Some(ph) = reading.ph() {
        let (rec, issue) = ph_rule(ph, thresholds);
        recommendations.push(rec);
        has_issue |= issue;
    }

    if let Some(humidity) = reading.humidity() {
        let (rec, issue) = humidity_rule(humidity, history, thresholds);
        recommendations.push(rec);
        has_issue |= issue;
    }

    if let Some(temperature) = reading.temperature() {
        let (rec, issue) = temperature_rule(temperature, thresholds);
        recommendations.push(rec);
        has_issue |= issue;
    }

    let status = if recommendations.is_empty() {
        EvaluationStatus::NoSpecificRecommendations
    } else if !has_issue && recommendations.iter().all(|r| r.severity == Severity::Info) {
        EvaluationStatus::AllClear
    } else {
        EvaluationStatus::Advisories
    };

    Evaluation {
        status,
        recommendations,
        has_issue,
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn ph_rule(ph: f64, t: &AdvisoryThresholds) -> (Recommendation, bool) {
    if ph < t.ph_min {
        (
            alerta(format!("pH ({:.1}) too low (acidic), consider liming.", ph)),
            true,
        )
    } else if ph > t.ph_max {
        (
            alerta(format!(
                "pH ({:.1}) too high (alkaline), consider sulfur amendment.",
                ph
            )),
            true,
        )
    } else {
        (info(format!("Soil pH ({:.1}) in acceptable range.", ph)), false)
    }
}

/// Always a single message. It escalates to ALERTA when the urgent,
/// drainage or deviation clauses fire; the "low, consider irrigation"
/// clause stays INFO and does not raise an issue.
fn humidity_rule(
    humidity: f64,
    history: Option<&HistoricalContext>,
    t: &AdvisoryThresholds,
) -> (Recommendation, bool) {
    let mut message = format!("Humidity: current {:.1}%.", humidity);
    let mut issue = false;

    if humidity < t.very_low_humidity {
        message.push_str(" Level very low, urgent irrigation needed!");
        issue = true;
    } else if humidity < t.low_humidity {
        message.push_str(" Level low, consider irrigation.");
    } else if humidity > t.very_high_humidity {
        message.push_str(" Level very high, check drainage!");
        issue = true;
    }

    if let Some(ctx) = history {
        let average = ctx.monthly_average_humidity;
        message.push_str(&format!(
            " (Historical average for {} in {}: {:.1}%).",
            ctx.month, ctx.region_label, average
        ));
        if humidity < average * t.drier_ratio {
            message.push_str(" Currently much drier than average!");
            issue = true;
        } else if humidity > average * t.wetter_ratio {
            message.push_str(" Currently much wetter than average!");
            issue = true;
        }
    }

    let severity = if issue { Severity::Alerta } else { Severity::Info };
    (Recommendation { severity, message }, issue)
}

/// Frost risk is an AVISO and, unlike heat stress, does not raise an issue.
fn temperature_rule(temperature: f64, t: &AdvisoryThresholds) -> (Recommendation, bool) {
    if temperature > t.heat_temperature {
        (
            alerta(format!(
                "Temperature ({:.1}°C) too high, ensure humidity/shade.",
                temperature
            )),
            true,
        )
    } else if temperature < t.frost_temperature {
        (
            Recommendation {
                severity: Severity::Aviso,
                message: format!(
                    "Temperature ({:.1}°C) too low, protect from frost.",
                    temperature
                ),
            },
            false,
        )
    } else {
        (
            info(format!("Temperature ({:.1}°C) in normal range.", temperature)),
            false,
        )
    }
}

fn alerta(message: String) -> Recommendation {
    Recommendation {
        severity: Severity::Alerta,
        message,
    }
}

fn info(message: String) -> Recommendation {
    Recommendation {
        severity: Severity::Info,
        message,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
