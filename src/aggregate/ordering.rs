//! Timestamp ordering for record sequences.

use crate::model::MeasurementRecord;

/// Sorts newest first. Stable, so equal timestamps keep their incoming
/// (store) order.
pub fn sort_newest_first(records: &mut [MeasurementRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Turns a newest-first page from the store into oldest-first order for
/// charting.
pub fn newest_first_to_chronological(records: &mut [MeasurementRecord]) {
    records.reverse();
}
