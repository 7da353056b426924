//! Arrival-ordered in-memory store.
//!
//! Backs dev mode and the test suites. Records are immutable once added;
//! the vector order is the arrival order used to break timestamp ties.

use async_trait::async_trait;

use super::{MeasurementStore, StoreError};
use crate::model::MeasurementRecord;

#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    records: Vec<MeasurementRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<MeasurementRecord>) -> Self {
        Self { records }
    }

    /// Appends records in arrival order. Used while seeding, before the store
    /// is shared.
    pub fn extend<I: IntoIterator<Item = MeasurementRecord>>(&mut self, records: I) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MeasurementStore for InMemoryStore {
    async fn latest(&self, location: &str, limit: usize) -> Result<Vec<MeasurementRecord>, StoreError> {
        let mut matching: Vec<&MeasurementRecord> =
            self.records.iter().filter(|r| r.location == location).collect();
        // Stable: equal timestamps keep arrival order.
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(matching.into_iter().take(limit).cloned().collect())
    }

    async fn all(&self) -> Result<Vec<MeasurementRecord>, StoreError> {
        Ok(self.records.clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
