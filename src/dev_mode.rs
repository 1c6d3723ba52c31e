//! Development mode utilities: simulated soil sensor readings.
//!
//! When no physical sensor is attached, readings are drawn uniformly from
//! plausible ranges and written to the reading store, either one at a time
//! (the dashboard's "simulate new reading" action) or as a seed batch.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::ingest::ReadingSink;
use crate::logging::{self, DataSource};
use crate::model::SensorReading;

/// Value ranges (inclusive) and rounding for simulated readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationRanges {
    pub temperature: (f64, f64),
    pub ph: (f64, f64),
    pub humidity: (f64, f64),
    /// Decimal places every value is rounded to.
    pub decimals: i32,
}

impl SimulationRanges {
    /// Single reading triggered from the dashboard.
    pub const MANUAL_TRIGGER: SimulationRanges = SimulationRanges {
        temperature: (10.0, 35.0),
        ph: (5.5, 7.5),
        humidity: (30.0, 80.0),
        decimals: 1,
    };

    /// Batch seeding of a fresh store.
    pub const SEED_BATCH: SimulationRanges = SimulationRanges {
        temperature: (20.0, 40.0),
        ph: (6.0, 8.0),
        humidity: (50.0, 90.0),
        decimals: 2,
    };
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn draw<R: Rng + ?Sized>(rng: &mut R, (low, high): (f64, f64), decimals: i32) -> f64 {
    round_to(rng.random_range(low..=high), decimals)
}

/// Draws one reading stamped `now`.
pub fn simulate_reading<R: Rng + ?Sized>(
    rng: &mut R,
    ranges: &SimulationRanges,
    now: DateTime<Utc>,
) -> SensorReading {
    SensorReading::new()
        .with_temperature(draw(rng, ranges.temperature, ranges.decimals))
        .with_ph(draw(rng, ranges.ph, ranges.decimals))
        .with_humidity(draw(rng, ranges.humidity, ranges.decimals))
        .with_timestamp(now)
}

/// Outcome of a seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub stored: usize,
    pub failed: usize,
}

/// Configuration for seeding the store with simulated readings
pub struct DevMode {
    /// Number of readings per batch (default: 10)
    pub batch_size: usize,
    /// Pause between readings (default: 1 second)
    pub interval: Duration,
    pub ranges: SimulationRanges,
}

impl Default for DevMode {
    fn default() -> Self {
        Self {
            batch_size: 10,
            interval: Duration::from_secs(1),
            ranges: SimulationRanges::SEED_BATCH,
        }
    }
}

impl DevMode {
    pub fn new(batch_size: usize, interval: Duration) -> Self {
        Self {
            batch_size,
            interval,
            ..Self::default()
        }
    }

    /// Writes `batch_size` readings to `sink`, pausing `interval` between
    /// them. Reading `i` is stamped `start + i * interval`, held at the last
    /// representable time if that overflows. A failed write is logged and
    /// the batch carries on.
    pub fn seed_readings<R: Rng + ?Sized>(
        &self,
        sink: &mut dyn ReadingSink,
        rng: &mut R,
        start: DateTime<Utc>,
    ) -> SeedSummary {
        let step = chrono::Duration::from_std(self.interval).unwrap_or_else(|_| chrono::Duration::zero());
        let mut summary = SeedSummary::default();
        let mut at = start;

        for i in 0..self.batch_size {
            if i > 0 {
                if !self.interval.is_zero() {
                    std::thread::sleep(self.interval);
                }
                at = at.checked_add_signed(step).unwrap_or(at);
            }
            let reading = simulate_reading(rng, &self.ranges, at);

            match sink.store_reading(&reading) {
                Ok(()) => {
                    tracing::debug!(
                        index = i + 1,
                        temperature = reading.temperature(),
                        ph = reading.ph(),
                        humidity = reading.humidity(),
                        "Stored simulated reading"
                    );
                    summary.stored += 1;
                }
                Err(e) => {
                    logging::log_source_failure(DataSource::Sensor, None, "Store simulated reading", &e);
                    summary.failed += 1;
                }
            }
        }

        logging::log_batch_summary(DataSource::Sensor, "Seeding", summary.stored, summary.failed);
        summary
    }
}
