//! Soil monitoring dashboard service.
//!
//! Combines the latest soil sensor reading, AEMET historical monthly
//! statistics and real-time AEMET station observations into a per-region
//! dashboard with rule-based soil recommendations.

pub mod alert;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod dev_mode;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod regions;
