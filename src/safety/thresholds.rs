//! Ice thickness safety classification.
//!
//! This is the one place the thickness rule lives. Labels found in stored
//! records were computed at ingestion time and may predate a rule change, so
//! callers recompute whenever a raw thickness is available.

use crate::model::{MeasurementRecord, SafetyStatus};

/// Minimum thickness, in centimetres, for a `Safe` label (inclusive).
pub const SAFE_MIN_CM: f64 = 40.0;

/// Minimum thickness, in centimetres, for a `Caution` label (inclusive).
pub const CAUTION_MIN_CM: f64 = 30.0;

/// Classifies an ice thickness reading.
///
/// Total over all inputs: `None`, NaN and infinities are `Unknown`; every
/// finite value, negative ones included, maps to one of the three labels.
///
///   thickness >= 40       →  Safe
///   30 <= thickness < 40  →  Caution
///   thickness < 30        →  Unsafe
pub fn classify(thickness_cm: Option<f64>) -> SafetyStatus {
    match thickness_cm {
        Some(t) if !t.is_finite() => SafetyStatus::Unknown,
        Some(t) if t >= SAFE_MIN_CM => SafetyStatus::Safe,
        Some(t) if t >= CAUTION_MIN_CM => SafetyStatus::Caution,
        Some(_) => SafetyStatus::Unsafe,
        None => SafetyStatus::Unknown,
    }
}

/// Picks the label to report for a stored record.
///
/// Precedence: finite thickness → `classify`; otherwise the stored label if it
/// was recognised at decode time; otherwise `Unknown`.
pub fn resolve_status(record: &MeasurementRecord) -> SafetyStatus {
    match record.avg_ice_thickness_cm {
        Some(t) if t.is_finite() => classify(Some(t)),
        _ => record.safety_status.unwrap_or(SafetyStatus::Unknown),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn record_with(thickness: Option<f64>, stored: Option<SafetyStatus>) -> MeasurementRecord {
        let mut record = MeasurementRecord::new(
            "dowslake",
            Utc.with_ymd_and_hms(2025, 1, 20, 14, 5, 0).unwrap(),
            thickness,
        );
        record.safety_status = stored;
        record
    }

    // --- Boundaries ---------------------------------------------------------

    #[test]
    fn test_boundaries_are_inclusive_lower_bounds() {
        assert_eq!(classify(Some(40.0)), SafetyStatus::Safe);
        assert_eq!(classify(Some(39.999)), SafetyStatus::Caution);
        assert_eq!(classify(Some(30.0)), SafetyStatus::Caution);
        assert_eq!(classify(Some(29.999)), SafetyStatus::Unsafe);
    }

    #[test]
    fn test_negative_thickness_is_unsafe_not_a_fault() {
        assert_eq!(classify(Some(-5.0)), SafetyStatus::Unsafe);
        assert_eq!(classify(Some(f64::MIN)), SafetyStatus::Unsafe);
    }

    #[test]
    fn test_missing_or_non_finite_is_unknown() {
        assert_eq!(classify(None), SafetyStatus::Unknown);
        assert_eq!(classify(Some(f64::NAN)), SafetyStatus::Unknown);
        assert_eq!(classify(Some(f64::INFINITY)), SafetyStatus::Unknown);
        assert_eq!(classify(Some(f64::NEG_INFINITY)), SafetyStatus::Unknown);
    }

    #[test]
    fn test_non_numeric_thickness_in_stored_json_is_unknown() {
        let record: MeasurementRecord = serde_json::from_str(
            r#"{"location":"nac","timestamp":"2025-01-20T14:05:00Z","avgIceThicknessCm":"x"}"#,
        )
        .unwrap();
        assert_eq!(resolve_status(&record), SafetyStatus::Unknown);
    }

    // --- Stored label precedence ---------------------------------------------

    #[test]
    fn test_raw_thickness_overrides_stale_stored_label() {
        let record = record_with(Some(22.0), Some(SafetyStatus::Safe));
        assert_eq!(resolve_status(&record), SafetyStatus::Unsafe);
    }

    #[test]
    fn test_stored_label_used_when_thickness_missing() {
        let record = record_with(None, Some(SafetyStatus::Caution));
        assert_eq!(resolve_status(&record), SafetyStatus::Caution);
    }

    #[test]
    fn test_stored_label_used_when_thickness_is_nan() {
        let record = record_with(Some(f64::NAN), Some(SafetyStatus::Safe));
        assert_eq!(resolve_status(&record), SafetyStatus::Safe);
    }

    #[test]
    fn test_nothing_to_go_on_is_unknown() {
        assert_eq!(resolve_status(&record_with(None, None)), SafetyStatus::Unknown);
    }

    // --- Properties ----------------------------------------------------------

    proptest! {
        #[test]
        fn safe_iff_at_least_forty(t in -1.0e6f64..1.0e6) {
            prop_assert_eq!(classify(Some(t)) == SafetyStatus::Safe, t >= 40.0);
        }

        #[test]
        fn caution_iff_thirty_to_forty(t in -1.0e6f64..1.0e6) {
            prop_assert_eq!(
                classify(Some(t)) == SafetyStatus::Caution,
                (30.0..40.0).contains(&t)
            );
        }

        #[test]
        fn unsafe_iff_below_thirty(t in -1.0e6f64..1.0e6) {
            prop_assert_eq!(classify(Some(t)) == SafetyStatus::Unsafe, t < 30.0);
        }

        #[test]
        fn finite_input_never_unknown(t in -1.0e300f64..1.0e300) {
            prop_assert_ne!(classify(Some(t)), SafetyStatus::Unknown);
        }
    }
}
