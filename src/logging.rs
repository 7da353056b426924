/// Structured logging for the canal ice monitoring service
///
/// Events go through `tracing` and carry a `source` tag plus, where one
/// applies, the canal `location` key. Store failures are classified before
/// they are logged so a dropped connection stands out from a single
/// malformed row.
use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::store::StoreError;

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Store,
    Api,
    Dev,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Store => write!(f, "STORE"),
            DataSource::Api => write!(f, "API"),
            DataSource::Dev => write!(f, "DEV"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Unexpected failure - store unreachable or rejecting queries
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. Calling this twice (tests, embedded
/// use) leaves the first subscriber in place.
pub fn init_logger(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        debug(DataSource::System, None, "logger already initialised");
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: DataSource, location: Option<&str>, message: &str) {
    tracing::info!(source = %source, location = location.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: DataSource, location: Option<&str>, message: &str) {
    tracing::warn!(source = %source, location = location.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: DataSource, location: Option<&str>, message: &str) {
    tracing::error!(source = %source, location = location.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: DataSource, location: Option<&str>, message: &str) {
    tracing::debug!(source = %source, location = location.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a store failure by its kind.
///
/// Connection and query failures mean the store is unreachable or rejecting
/// the service; a decode failure points at one malformed row written by the
/// ingestion side.
pub fn classify_store_failure(err: &StoreError) -> FailureType {
    match err {
        StoreError::Connection { .. } | StoreError::Query { .. } => FailureType::Unexpected,
        StoreError::Decode { .. } => FailureType::Unknown,
    }
}

/// Log a store failure with automatic classification
pub fn log_store_failure(location: Option<&str>, operation: &str, err: &StoreError) {
    let failure_type = classify_store_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Unexpected => error(DataSource::Store, location, &message),
        FailureType::Unknown => warn(DataSource::Store, location, &message),
    }
}

// ---------------------------------------------------------------------------
// Fan-out Summary Logging
// ---------------------------------------------------------------------------

/// Log how many of the monitored locations returned a record.
///
/// Fewer answers than locations is a data gap, not an error; it is logged at
/// warn so that silent sensors show up. Zero answers is logged at error.
pub fn log_fanout_summary(operation: &str, total: usize, answered: usize) {
    let message = format!(
        "{}: {}/{} locations reported, {} without data",
        operation,
        answered,
        total,
        total.saturating_sub(answered)
    );

    if answered >= total {
        debug(DataSource::Store, None, &message);
    } else if answered == 0 {
        error(DataSource::Store, None, &message);
    } else {
        warn(DataSource::Store, None, &message);
    }
}
