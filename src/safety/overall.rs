//! Reduction of per-location labels into one system-wide label.

use crate::model::SafetyStatus;

/// Most-severe-wins reduction.
///
/// First match wins:
///   1. any `Unsafe`           →  Unsafe
///   2. any `Caution`          →  Caution
///   3. non-empty, all `Safe`  →  Safe
///   4. otherwise              →  Unknown
///
/// An empty input, or any `Unknown` mixed with `Safe`, is `Unknown`: missing
/// data never reports as `Safe`.
pub fn overall_status<I>(statuses: I) -> SafetyStatus
where
    I: IntoIterator<Item = SafetyStatus>,
{
    let mut seen_any = false;
    let mut all_safe = true;
    let mut any_caution = false;

    for status in statuses {
        seen_any = true;
        match status {
            SafetyStatus::Unsafe => return SafetyStatus::Unsafe,
            SafetyStatus::Caution => any_caution = true,
            SafetyStatus::Safe => {}
            SafetyStatus::Unknown => all_safe = false,
        }
    }

    if any_caution {
        SafetyStatus::Caution
    } else if seen_any && all_safe {
        SafetyStatus::Safe
    } else {
        SafetyStatus::Unknown
    }
}
