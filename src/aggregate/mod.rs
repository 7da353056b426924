/// Multi-location aggregation over the measurement store.
///
/// Every request re-queries the store; nothing is cached between calls. The
/// per-location queries of one request run concurrently and are joined before
/// reduction, and results are always assembled in registry order regardless of
/// which query finished first.
///
/// A failed query for any one location fails the whole request with
/// `DataUnavailable`. A partial snapshot is never returned: a consumer
/// deciding whether ice is safe must not mistake a missing failure for a
/// missing location.
///
/// Submodules:
/// - `ordering` — timestamp ordering helpers shared by the queries.
pub mod ordering;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;

use crate::locations::{self, LOCATION_REGISTRY, MonitoredLocation};
use crate::logging::{self, DataSource};
use crate::model::{LatestSnapshot, LocationStatus, MeasurementRecord, SystemStatus};
use crate::safety::{overall_status, resolve_status};
use crate::store::{MeasurementStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// The store could not be read. `location` is `None` for the full scan.
    #[error("data unavailable ({}): {source}", .location.as_deref().unwrap_or("all records"))]
    DataUnavailable {
        location: Option<String>,
        source: StoreError,
    },
}

/// Result of a history query.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    /// The key the store was queried with.
    pub location: String,
    /// Oldest first.
    pub records: Vec<MeasurementRecord>,
}

#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn MeasurementStore>,
    locations: &'static [MonitoredLocation],
}

impl Aggregator {
    /// Aggregator over every location in the registry.
    pub fn new(store: Arc<dyn MeasurementStore>) -> Self {
        Self::with_locations(store, LOCATION_REGISTRY)
    }

    pub fn with_locations(store: Arc<dyn MeasurementStore>, locations: &'static [MonitoredLocation]) -> Self {
        Self { store, locations }
    }

    pub fn locations(&self) -> &'static [MonitoredLocation] {
        self.locations
    }

    pub fn store(&self) -> &Arc<dyn MeasurementStore> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Latest
    // -----------------------------------------------------------------------

    /// Newest record per location with a freshly resolved `safety_status`.
    ///
    /// Locations with no records are left out, so the snapshot may hold fewer
    /// records than there are locations.
    pub async fn latest_at(&self, now: DateTime<Utc>) -> Result<LatestSnapshot, AggregateError> {
        let newest = self.newest_per_location("latest").await?;
        let records = newest
            .into_iter()
            .flatten()
            .map(|mut record| {
                record.safety_status = Some(resolve_status(&record));
                record
            })
            .collect();

        Ok(LatestSnapshot {
            generated_at: now,
            records,
        })
    }

    /// Convenience wrapper that stamps the snapshot with the real current time.
    pub async fn latest(&self) -> Result<LatestSnapshot, AggregateError> {
        self.latest_at(Utc::now()).await
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// The `limit` most recent records for one location, oldest first.
    ///
    /// `location` may be a key, display name or alias. Anything the registry
    /// does not recognise is passed to the store verbatim and simply finds
    /// nothing. Records are returned as stored, without relabelling.
    pub async fn history(&self, location: &str, limit: usize) -> Result<History, AggregateError> {
        let key = match locations::resolve_location(location) {
            Ok(known) => known.key.to_string(),
            Err(unknown) => {
                logging::debug(
                    DataSource::Store,
                    Some(location),
                    &format!("history requested for {unknown}; querying as given"),
                );
                location.to_string()
            }
        };

        let mut records = self
            .store
            .latest(&key, limit)
            .await
            .map_err(|source| unavailable(Some(&key), "history", source))?;
        ordering::newest_first_to_chronological(&mut records);

        Ok(History { location: key, records })
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Per-location labels from each newest record, reduced to one overall label.
    pub async fn status(&self) -> Result<SystemStatus, AggregateError> {
        let newest = self.newest_per_location("status").await?;
        let locations: Vec<LocationStatus> = newest
            .into_iter()
            .flatten()
            .map(|record| LocationStatus {
                safety_status: resolve_status(&record),
                location: record.location,
                timestamp: record.timestamp,
            })
            .collect();

        Ok(SystemStatus {
            overall_status: overall_status(locations.iter().map(|l| l.safety_status)),
            locations,
        })
    }

    // -----------------------------------------------------------------------
    // All
    // -----------------------------------------------------------------------

    /// Every stored record, newest first; ties keep store order.
    pub async fn all(&self) -> Result<Vec<MeasurementRecord>, AggregateError> {
        let mut records = self
            .store
            .all()
            .await
            .map_err(|source| unavailable(None, "full scan", source))?;
        ordering::sort_newest_first(&mut records);
        Ok(records)
    }

    // -----------------------------------------------------------------------
    // Fan-out
    // -----------------------------------------------------------------------

    /// One `latest(key, 1)` per location, run concurrently, joined in
    /// registry order. The first failure aborts the batch.
    async fn newest_per_location(
        &self,
        operation: &str,
    ) -> Result<Vec<Option<MeasurementRecord>>, AggregateError> {
        let queries = self.locations.iter().map(|location| async move {
            self.store
                .latest(location.key, 1)
                .await
                .map(|rows| rows.into_iter().next())
                .map_err(|source| unavailable(Some(location.key), operation, source))
        });

        let newest = try_join_all(queries).await?;
        let answered = newest.iter().filter(|r| r.is_some()).count();
        logging::log_fanout_summary(operation, self.locations.len(), answered);
        Ok(newest)
    }
}

fn unavailable(location: Option<&str>, operation: &str, source: StoreError) -> AggregateError {
    logging::log_store_failure(location, operation, &source);
    AggregateError::DataUnavailable {
        location: location.map(str::to_string),
        source,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SafetyStatus;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, 9, 0, 0).unwrap()
    }

    fn aggregator(records: Vec<MeasurementRecord>) -> Aggregator {
        Aggregator::new(Arc::new(InMemoryStore::from_records(records)))
    }

    /// Answers normally except for one location, which always fails.
    struct FailingFor {
        inner: InMemoryStore,
        broken: &'static str,
    }

    #[async_trait]
    impl MeasurementStore for FailingFor {
        async fn latest(&self, location: &str, limit: usize) -> Result<Vec<MeasurementRecord>, StoreError> {
            if location == self.broken {
                return Err(StoreError::Query {
                    reason: "partition offline".to_string(),
                });
            }
            self.inner.latest(location, limit).await
        }

        async fn all(&self) -> Result<Vec<MeasurementRecord>, StoreError> {
            Err(StoreError::Connection {
                reason: "connection refused".to_string(),
            })
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    /// Answers from `inner` after a per-location delay, so queries finish in
    /// reverse registry order.
    struct SlowestFirst {
        inner: InMemoryStore,
    }

    #[async_trait]
    impl MeasurementStore for SlowestFirst {
        async fn latest(&self, location: &str, limit: usize) -> Result<Vec<MeasurementRecord>, StoreError> {
            let delay_ms = match location {
                "dowslake" => 60,
                "fifthave" => 30,
                _ => 0,
            };
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            self.inner.latest(location, limit).await
        }

        async fn all(&self) -> Result<Vec<MeasurementRecord>, StoreError> {
            self.inner.all().await
        }

        fn backend_name(&self) -> &'static str {
            "slowest-first"
        }
    }

    // --- Latest ---------------------------------------------------------------

    #[tokio::test]
    async fn test_latest_overrides_stored_label_and_keeps_registry_order() {
        let mut stale = MeasurementRecord::new("nac", base(), Some(18.0));
        stale.safety_status = Some(SafetyStatus::Safe);
        let agg = aggregator(vec![
            stale,
            MeasurementRecord::new("dowslake", base(), Some(44.0)),
            MeasurementRecord::new("fifthave", base(), Some(35.0)),
        ]);

        let snapshot = agg.latest_at(base() + Duration::minutes(1)).await.unwrap();
        let keys: Vec<&str> = snapshot.records.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(keys, vec!["dowslake", "fifthave", "nac"]);
        assert_eq!(snapshot.records[2].safety_status, Some(SafetyStatus::Unsafe));
        assert_eq!(snapshot.generated_at, base() + Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_latest_omits_locations_without_records() {
        let agg = aggregator(vec![MeasurementRecord::new("fifthave", base(), Some(41.0))]);
        let snapshot = agg.latest().await.unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert!(snapshot.records.len() <= agg.locations().len());
    }

    #[tokio::test]
    async fn test_latest_picks_newest_record() {
        let agg = aggregator(vec![
            MeasurementRecord::new("dowslake", base() + Duration::minutes(10), Some(41.0)),
            MeasurementRecord::new("dowslake", base(), Some(12.0)),
        ]);
        let snapshot = agg.latest().await.unwrap();
        assert_eq!(snapshot.records[0].avg_ice_thickness_cm, Some(41.0));
    }

    #[tokio::test]
    async fn test_one_failing_location_aborts_latest() {
        let agg = Aggregator::new(Arc::new(FailingFor {
            inner: InMemoryStore::from_records(vec![MeasurementRecord::new("dowslake", base(), Some(50.0))]),
            broken: "fifthave",
        }));
        match agg.latest().await {
            Err(AggregateError::DataUnavailable { location, .. }) => {
                assert_eq!(location.as_deref(), Some("fifthave"))
            }
            Ok(snapshot) => panic!("expected DataUnavailable, got {} records", snapshot.records.len()),
        }
    }

    #[tokio::test]
    async fn test_fanout_keeps_registry_order_when_queries_finish_out_of_order() {
        let agg = Aggregator::new(Arc::new(SlowestFirst {
            inner: InMemoryStore::from_records(vec![
                MeasurementRecord::new("nac", base(), Some(20.0)),
                MeasurementRecord::new("fifthave", base(), Some(32.0)),
                MeasurementRecord::new("dowslake", base(), Some(45.0)),
            ]),
        }));

        let snapshot = agg.latest().await.unwrap();
        let keys: Vec<&str> = snapshot.records.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(keys, vec!["dowslake", "fifthave", "nac"]);

        let status = agg.status().await.unwrap();
        let keys: Vec<&str> = status.locations.iter().map(|l| l.location.as_str()).collect();
        assert_eq!(keys, vec!["dowslake", "fifthave", "nac"]);
        assert_eq!(status.overall_status, SafetyStatus::Unsafe);
    }

    // --- History --------------------------------------------------------------

    #[tokio::test]
    async fn test_history_returns_most_recent_oldest_first() {
        let records: Vec<_> = (0..15)
            .map(|i| MeasurementRecord::new("nac", base() + Duration::minutes(5 * i), Some(i as f64)))
            .collect();
        let agg = aggregator(records);

        let history = agg.history("nac", 12).await.unwrap();
        assert_eq!(history.records.len(), 12);
        let thicknesses: Vec<f64> = history
            .records
            .iter()
            .filter_map(|r| r.avg_ice_thickness_cm)
            .collect();
        let expected: Vec<f64> = (3..15).map(|i| i as f64).collect();
        assert_eq!(thicknesses, expected);
    }

    #[tokio::test]
    async fn test_history_does_not_relabel() {
        let mut record = MeasurementRecord::new("nac", base(), Some(10.0));
        record.safety_status = Some(SafetyStatus::Safe);
        let agg = aggregator(vec![record]);

        let history = agg.history("nac", 12).await.unwrap();
        assert_eq!(history.records[0].safety_status, Some(SafetyStatus::Safe));
    }

    #[tokio::test]
    async fn test_history_resolves_aliases() {
        let agg = aggregator(vec![MeasurementRecord::new("dowslake", base(), Some(40.0))]);
        let history = agg.history("Dow's Lake", 12).await.unwrap();
        assert_eq!(history.location, "dowslake");
        assert_eq!(history.records.len(), 1);
    }

    #[tokio::test]
    async fn test_history_for_unknown_location_is_empty_not_an_error() {
        let agg = aggregator(vec![MeasurementRecord::new("dowslake", base(), Some(40.0))]);
        let history = agg.history("hogsback", 12).await.unwrap();
        assert_eq!(history.location, "hogsback");
        assert!(history.records.is_empty());
    }

    // --- Status ---------------------------------------------------------------

    #[tokio::test]
    async fn test_status_end_to_end_example() {
        let agg = aggregator(vec![
            MeasurementRecord::new("dowslake", base(), Some(45.0)),
            MeasurementRecord::new("fifthave", base(), Some(32.0)),
            MeasurementRecord::new("nac", base(), Some(20.0)),
        ]);
        let status = agg.status().await.unwrap();
        assert_eq!(status.overall_status, SafetyStatus::Unsafe);
        let labels: Vec<(&str, SafetyStatus)> = status
            .locations
            .iter()
            .map(|l| (l.location.as_str(), l.safety_status))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("dowslake", SafetyStatus::Safe),
                ("fifthave", SafetyStatus::Caution),
                ("nac", SafetyStatus::Unsafe),
            ]
        );
    }

    #[tokio::test]
    async fn test_status_with_no_data_is_unknown() {
        let status = aggregator(Vec::new()).status().await.unwrap();
        assert_eq!(status.overall_status, SafetyStatus::Unknown);
        assert!(status.locations.is_empty());
    }

    #[tokio::test]
    async fn test_status_missing_thickness_falls_back_to_stored_label() {
        let mut record = MeasurementRecord::new("nac", base(), None);
        record.safety_status = Some(SafetyStatus::Caution);
        let status = aggregator(vec![record]).status().await.unwrap();
        assert_eq!(status.locations[0].safety_status, SafetyStatus::Caution);
        assert_eq!(status.overall_status, SafetyStatus::Caution);
    }

    #[tokio::test]
    async fn test_status_is_idempotent() {
        let agg = aggregator(vec![
            MeasurementRecord::new("dowslake", base(), Some(45.0)),
            MeasurementRecord::new("nac", base(), None),
        ]);
        let first = agg.status().await.unwrap();
        let second = agg.status().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.overall_status, SafetyStatus::Unknown);
    }

    #[tokio::test]
    async fn test_one_failing_location_aborts_status() {
        let agg = Aggregator::new(Arc::new(FailingFor {
            inner: InMemoryStore::new(),
            broken: "nac",
        }));
        assert!(agg.status().await.is_err());
    }

    // --- All ------------------------------------------------------------------

    #[tokio::test]
    async fn test_all_is_newest_first() {
        let agg = aggregator(vec![
            MeasurementRecord::new("nac", base(), None),
            MeasurementRecord::new("dowslake", base() + Duration::hours(1), None),
            MeasurementRecord::new("fifthave", base() + Duration::minutes(30), None),
        ]);
        let all = agg.all().await.unwrap();
        let keys: Vec<&str> = all.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(keys, vec!["dowslake", "fifthave", "nac"]);
    }

    #[tokio::test]
    async fn test_all_surfaces_store_failure() {
        let agg = Aggregator::new(Arc::new(FailingFor {
            inner: InMemoryStore::new(),
            broken: "none",
        }));
        match agg.all().await {
            Err(err @ AggregateError::DataUnavailable { location: None, .. }) => {
                assert!(err.to_string().starts_with("data unavailable (all records)"))
            }
            Err(other) => panic!("expected a full-scan failure, got {other}"),
            Ok(_) => panic!("expected DataUnavailable"),
        }
    }
}
