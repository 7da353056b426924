/// Core data types for the Rideau Canal ice monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// the stored measurement record, the safety label, and the derived per-location
/// and system-wide status shapes returned over HTTP. It contains no I/O.
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Safety label
// ---------------------------------------------------------------------------

/// Three-state safety label plus `Unknown` for missing data.
///
/// Serialized exactly as the variant name (`"Safe"`, `"Caution"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyStatus {
    Safe,
    Caution,
    Unsafe,
    Unknown,
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyStatus::Safe => write!(f, "Safe"),
            SafetyStatus::Caution => write!(f, "Caution"),
            SafetyStatus::Unsafe => write!(f, "Unsafe"),
            SafetyStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Returned when a stored label is not one of the four known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised safety label: {0:?}")]
pub struct UnrecognisedLabel(pub String);

impl FromStr for SafetyStatus {
    type Err = UnrecognisedLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(SafetyStatus::Safe),
            "caution" => Ok(SafetyStatus::Caution),
            "unsafe" => Ok(SafetyStatus::Unsafe),
            "unknown" => Ok(SafetyStatus::Unknown),
            _ => Err(UnrecognisedLabel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Measurement record
// ---------------------------------------------------------------------------

/// One aggregated measurement window for one location, as held by the store.
///
/// Every field besides `location` and `timestamp` may be absent. Fields the
/// service does not model (window bounds, reading counts, store metadata) are
/// kept in `extra` and written back out untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub location: String,
    /// Window-end time; the ordering key. Not guaranteed unique.
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub avg_ice_thickness_cm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub avg_surface_temperature_c: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub max_snow_accumulation_cm: Option<f64>,
    /// Label computed at ingestion time. Advisory only; may be stale.
    #[serde(default, deserialize_with = "lenient_label", skip_serializing_if = "Option::is_none")]
    pub safety_status: Option<SafetyStatus>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MeasurementRecord {
    /// A bare record with only the ordering keys and an ice thickness.
    pub fn new(location: &str, timestamp: DateTime<Utc>, avg_ice_thickness_cm: Option<f64>) -> Self {
        Self {
            id: None,
            location: location.to_string(),
            timestamp,
            avg_ice_thickness_cm,
            avg_surface_temperature_c: None,
            max_snow_accumulation_cm: None,
            safety_status: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Non-numeric JSON values (strings, booleans, objects) decode as absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

fn lenient_label<'de, D>(deserializer: D) -> Result<Option<SafetyStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok()))
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// Per-location summary produced by the status query. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStatus {
    pub location: String,
    pub safety_status: SafetyStatus,
    pub timestamp: DateTime<Utc>,
}

/// Overall label plus the per-location entries it was reduced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub overall_status: SafetyStatus,
    pub locations: Vec<LocationStatus>,
}

/// Latest record per location, enriched with a fresh `safety_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestSnapshot {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<MeasurementRecord>,
}
