//! Soil advisories: threshold values and the recommendation rules that
//! apply them to the latest reading.

pub mod recommendations;
pub mod thresholds;
