//! Structured logging for the soil monitoring service.
//!
//! Library code logs through `tracing` macros. `init` installs the
//! subscriber once per process: compact console output, optionally
//! mirrored to an append-only log file for unattended runs.
//!
//! Data source failures are tagged with where they came from and
//! classified, so that an offline station shows up at debug level while a
//! broken API key or database shows up as an error.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::model::SourceError;

// ---------------------------------------------------------------------------
// Initialisation
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. When `log_file` is given, events
/// are also appended to it without ANSI colours. Calling this twice is
/// harmless: the second call leaves the first subscriber in place.
pub fn init(level: &str, log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_fmt::layer().with_target(false).compact())
        .with(file_layer)
        .try_init();

    Ok(())
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Sensor,
    Aemet,
    Database,
    Import,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Sensor => write!(f, "SENSOR"),
            DataSource::Aemet => write!(f, "AEMET"),
            DataSource::Database => write!(f, "DB"),
            DataSource::Import => write!(f, "IMPORT"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Station unknown or simply has no recent data
    Expected,
    /// Service degradation or configuration issue
    Unexpected,
    /// Transient, may clear on its own
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

pub fn classify_failure(err: &SourceError) -> FailureType {
    match err {
        SourceError::StationNotFound(_) | SourceError::NoDataAvailable(_) => FailureType::Expected,
        SourceError::RateLimited(_) => FailureType::Unknown,
        SourceError::HttpStatus(status) if *status >= 500 => FailureType::Unknown,
        _ => FailureType::Unexpected,
    }
}

/// Level a failure of the given type is logged at.
pub fn failure_level(failure: FailureType) -> Level {
    match failure {
        FailureType::Expected => Level::DEBUG,
        FailureType::Unexpected => Level::ERROR,
        FailureType::Unknown => Level::WARN,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Logs a data source failure with automatic classification.
pub fn log_source_failure(source: DataSource, subject: Option<&str>, operation: &str, err: &SourceError) {
    let failure = classify_failure(err);
    let subject = subject.unwrap_or("-");

    let level = failure_level(failure);
    if level == Level::DEBUG {
        tracing::debug!(%source, subject, %failure, "{} failed: {}", operation, err);
    } else if level == Level::ERROR {
        tracing::error!(%source, subject, %failure, "{} failed: {}", operation, err);
    } else {
        tracing::warn!(%source, subject, %failure, "{} failed: {}", operation, err);
    }
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Info when nothing failed, error when nothing succeeded, warn otherwise.
pub fn summary_level(successful: usize, failed: usize) -> Level {
    if failed == 0 {
        Level::INFO
    } else if successful == 0 {
        Level::ERROR
    } else {
        Level::WARN
    }
}

/// Logs the outcome of a batch operation (import, seeding, station sync).
pub fn log_batch_summary(source: DataSource, operation: &str, successful: usize, failed: usize) {
    let total = successful + failed;
    let level = summary_level(successful, failed);
    if level == Level::INFO {
        tracing::info!(%source, "{} complete: {}/{} successful", operation, successful, total);
    } else if level == Level::ERROR {
        tracing::error!(%source, "{} failed: 0/{} successful", operation, total);
    } else {
        tracing::warn!(%source, "{} complete: {}/{} successful, {} failed", operation, successful, total, failed);
    }
}
