//! Measurement store access.
//!
//! The service only ever reads, and only in two shapes: the newest `limit`
//! records for one location, and a full scan. Both backends implement
//! [`MeasurementStore`]; handlers receive the store as an explicitly
//! constructed `Arc<dyn MeasurementStore>` threaded through `AppState`.

pub mod memory;
pub mod pg;

use async_trait::async_trait;

use crate::model::MeasurementRecord;

pub use memory::InMemoryStore;
pub use pg::PostgresStore;

/// Errors raised by a store backend. Every variant means the data could not
/// be read; an empty result is never an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store connection failed: {reason}")]
    Connection { reason: String },

    #[error("store query failed: {reason}")]
    Query { reason: String },

    #[error("could not decode stored record: {reason}")]
    Decode { reason: String },
}

#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Newest-first records for `location`, at most `limit` of them.
    ///
    /// Records sharing a timestamp come back in arrival order. An unknown
    /// location yields an empty vector.
    async fn latest(&self, location: &str, limit: usize) -> Result<Vec<MeasurementRecord>, StoreError>;

    /// Every stored record, in arrival order.
    async fn all(&self) -> Result<Vec<MeasurementRecord>, StoreError>;

    /// Short backend name for health output and logs.
    fn backend_name(&self) -> &'static str;
}
