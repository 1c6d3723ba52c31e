//! Advisory thresholds for soil readings.
//!
//! The defaults are the agronomic limits the dashboard has always used.
//! They can be overridden from the `[thresholds]` section of the config
//! file, which deserializes straight into `AdvisoryThresholds`.

use serde::Deserialize;

/// Limits applied by `recommendations::evaluate_with`.
///
/// Ordering constraints (checked by `validate`):
///   very_low_humidity < low_humidity < very_high_humidity
///   ph_min < ph_max
///   frost_temperature < heat_temperature
///   drier_ratio < 1.0 < wetter_ratio
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdvisoryThresholds {
    /// pH strictly below this is acidic.
    pub ph_min: f64,
    /// pH strictly above this is alkaline.
    pub ph_max: f64,
    /// Humidity (%) strictly below this needs urgent irrigation.
    pub very_low_humidity: f64,
    /// Humidity (%) strictly below this suggests irrigation.
    pub low_humidity: f64,
    /// Humidity (%) strictly above this needs a drainage check.
    pub very_high_humidity: f64,
    /// Current humidity below `drier_ratio × historical average` is much drier.
    pub drier_ratio: f64,
    /// Current humidity above `wetter_ratio × historical average` is much wetter.
    pub wetter_ratio: f64,
    /// Temperature (°C) strictly above this is heat stress.
    pub heat_temperature: f64,
    /// Temperature (°C) strictly below this risks frost.
    pub frost_temperature: f64,
}

impl Default for AdvisoryThresholds {
    fn default() -> Self {
        Self {
            ph_min: 5.5,
            ph_max: 7.8,
            very_low_humidity: 25.0,
            low_humidity: 40.0,
            very_high_humidity: 85.0,
            drier_ratio: 0.6,
            wetter_ratio: 1.4,
            heat_temperature: 38.0,
            frost_temperature: 5.0,
        }
    }
}

impl AdvisoryThresholds {
    /// Checks the ordering constraints. Returns a description of the first
    /// violation found.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("ph_min", self.ph_min),
            ("ph_max", self.ph_max),
            ("very_low_humidity", self.very_low_humidity),
            ("low_humidity", self.low_humidity),
            ("very_high_humidity", self.very_high_humidity),
            ("drier_ratio", self.drier_ratio),
            ("wetter_ratio", self.wetter_ratio),
            ("heat_temperature", self.heat_temperature),
            ("frost_temperature", self.frost_temperature),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{} must be a finite number, got {}", name, value));
        }

        if !(self.ph_min < self.ph_max) {
            return Err(format!(
                "ph_min ({}) must be below ph_max ({})",
                self.ph_min, self.ph_max
            ));
        }
        if !(self.very_low_humidity < self.low_humidity
            && self.low_humidity < self.very_high_humidity)
        {
            return Err(format!(
                "humidity thresholds must ascend: very_low ({}) < low ({}) < very_high ({})",
                self.very_low_humidity, self.low_humidity, self.very_high_humidity
            ));
        }
        if !(self.drier_ratio < 1.0 && self.wetter_ratio > 1.0) {
            return Err(format!(
                "drier_ratio ({}) must be below 1 and wetter_ratio ({}) above 1",
                self.drier_ratio, self.wetter_ratio
            ));
        }
        if !(self.frost_temperature < self.heat_temperature) {
            return Err(format!(
                "frost_temperature ({}) must be below heat_temperature ({})",
                self.frost_temperature, self.heat_temperature
            ));
        }
        Ok(())
    }
}
