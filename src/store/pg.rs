//! PostgreSQL-backed measurement store.
//!
//! Uses the blocking `postgres` driver. Every query runs on tokio's blocking
//! pool; the single connection is opened on first use and re-opened if the
//! server dropped it. Schema: `sql/001_ice_measurements.sql`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ::postgres::{Client, Config, NoTls, Row};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{MeasurementStore, StoreError};
use crate::logging::{self, DataSource};
use crate::model::MeasurementRecord;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const COLUMNS: &str = "id, location, \"timestamp\", avg_ice_thickness_cm, \
                       avg_surface_temperature_c, max_snow_accumulation_cm, safety_status";

pub struct PostgresStore {
    inner: Arc<Connection>,
}

struct Connection {
    config: Config,
    table: String,
    client: Mutex<Option<Client>>,
}

/// Returns true for `name` or `schema.name` built from lowercase ASCII
/// letters, digits and underscores. The table name is interpolated into SQL,
/// so nothing else is accepted.
pub fn is_valid_table_name(table: &str) -> bool {
    let parts: Vec<&str> = table.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|p| {
            !p.is_empty()
                && !p.starts_with(|c: char| c.is_ascii_digit())
                && p.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        })
}

impl PostgresStore {
    /// Checks the table name and URL, then tries a first connection.
    /// Blocking; call from `spawn_blocking` or before the runtime starts.
    ///
    /// An unreachable server is not an error here: the store starts
    /// disconnected and every query retries the connection, failing with
    /// `StoreError::Connection` until the server is back.
    pub fn connect(database_url: &str, table: &str) -> Result<Self, StoreError> {
        if !is_valid_table_name(table) {
            return Err(StoreError::Connection {
                reason: format!("invalid table name: {table:?}"),
            });
        }
        let mut config: Config = database_url.parse().map_err(|e| StoreError::Connection {
            reason: format!("invalid database URL: {e}"),
        })?;
        config.connect_timeout(CONNECT_TIMEOUT);

        let client = match open(&config) {
            Ok(client) => Some(client),
            Err(e) => {
                logging::warn(
                    DataSource::Store,
                    None,
                    &format!("PostgreSQL unreachable at startup, will retry per request: {e}"),
                );
                None
            }
        };

        Ok(Self {
            inner: Arc::new(Connection {
                config,
                table: table.to_string(),
                client: Mutex::new(client),
            }),
        })
    }

    /// True while an open connection is held.
    pub fn is_connected(&self) -> bool {
        self.inner
            .client
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|c| !c.is_closed()))
            .unwrap_or(false)
    }

    async fn run<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Client, &str) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || conn.with_client(query))
            .await
            .map_err(|e| StoreError::Query {
                reason: format!("blocking query task failed: {e}"),
            })?
    }
}

impl Connection {
    fn with_client<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Client, &str) -> Result<T, StoreError>,
    {
        let mut guard = self.client.lock().map_err(|_| StoreError::Connection {
            reason: "connection lock poisoned".to_string(),
        })?;

        if guard.as_ref().is_none_or(|c| c.is_closed()) {
            *guard = Some(open(&self.config)?);
        }

        match guard.as_mut() {
            Some(client) => query(client, &self.table),
            None => Err(StoreError::Connection {
                reason: "no open connection".to_string(),
            }),
        }
    }
}

fn open(config: &Config) -> Result<Client, StoreError> {
    config.connect(NoTls).map_err(|e| StoreError::Connection {
        reason: e.to_string(),
    })
}

fn query_error(e: ::postgres::Error) -> StoreError {
    StoreError::Query { reason: e.to_string() }
}

fn decode_error(e: ::postgres::Error) -> StoreError {
    StoreError::Decode { reason: e.to_string() }
}

fn row_to_record(row: &Row) -> Result<MeasurementRecord, StoreError> {
    let stored_label: Option<String> = row.try_get("safety_status").map_err(decode_error)?;
    Ok(MeasurementRecord {
        id: row.try_get("id").map_err(decode_error)?,
        location: row.try_get("location").map_err(decode_error)?,
        timestamp: row.try_get::<_, DateTime<Utc>>("timestamp").map_err(decode_error)?,
        avg_ice_thickness_cm: row.try_get("avg_ice_thickness_cm").map_err(decode_error)?,
        avg_surface_temperature_c: row.try_get("avg_surface_temperature_c").map_err(decode_error)?,
        max_snow_accumulation_cm: row.try_get("max_snow_accumulation_cm").map_err(decode_error)?,
        safety_status: stored_label.and_then(|s| s.parse().ok()),
        extra: serde_json::Map::new(),
    })
}

#[async_trait]
impl MeasurementStore for PostgresStore {
    async fn latest(&self, location: &str, limit: usize) -> Result<Vec<MeasurementRecord>, StoreError> {
        let location = location.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.run(move |client, table| {
            let sql = format!(
                "SELECT {COLUMNS} FROM {table} \
                 WHERE location = $1 \
                 ORDER BY \"timestamp\" DESC, seq ASC \
                 LIMIT $2"
            );
            let rows = client.query(&sql, &[&location, &limit]).map_err(query_error)?;
            rows.iter().map(row_to_record).collect()
        })
        .await
    }

    async fn all(&self) -> Result<Vec<MeasurementRecord>, StoreError> {
        self.run(|client, table| {
            let sql = format!("SELECT {COLUMNS} FROM {table} ORDER BY seq ASC");
            let rows = client.query(&sql, &[]).map_err(query_error)?;
            rows.iter().map(row_to_record).collect()
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
