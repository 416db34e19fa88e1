//! Sensor registry for a gateway.
//!
//! The registry fetches the gateway's sensor table and keeps the most recent
//! unfiltered result so live data filtering does not need a second round
//! trip on every call.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::protocol::{CommandCode, parse_sensor_table};
use crate::transport::Transport;
use crate::types::{SensorFilter, SensorRecord};

/// Fetches and caches the sensor table.
///
/// The cache holds the last *unfiltered* fetch and is replaced wholesale each
/// time one completes. Filtered fetches never touch it. Concurrent callers
/// may observe a table that another task is about to replace; that only
/// affects how fresh the filtering is.
pub struct SensorRegistry<T> {
    transport: Arc<T>,
    cache: RwLock<Option<Arc<[SensorRecord]>>>,
}

impl<T: Transport> SensorRegistry<T> {
    /// Creates a registry with an empty cache.
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            cache: RwLock::new(None),
        }
    }

    /// Reads the sensor table, optionally filtered.
    ///
    /// With `None` the complete table is returned and cached.
    pub async fn get_sensors(&self, filter: Option<&SensorFilter>) -> Result<Vec<SensorRecord>> {
        let response = self
            .transport
            .run_command(CommandCode::ReadSensorId, Bytes::new())
            .await?;
        let sensors = parse_sensor_table(&response)?;

        match filter {
            Some(filter) => {
                let matched: Vec<_> = sensors.into_iter().filter(|s| filter.matches(s)).collect();
                tracing::debug!("sensor table: {} records after filter", matched.len());
                Ok(matched)
            }
            None => {
                tracing::debug!("sensor table: {} records, caching", sensors.len());
                *self.cache.write().await = Some(Arc::from(sensors.as_slice()));
                Ok(sensors)
            }
        }
    }

    /// Returns the cached table, or fetches (and caches) it if there is none.
    pub async fn sensors(&self) -> Result<Arc<[SensorRecord]>> {
        if let Some(cached) = self.cached().await {
            return Ok(cached);
        }
        let sensors = self.get_sensors(None).await?;
        Ok(Arc::from(sensors))
    }

    /// Returns the cached table without touching the gateway.
    pub async fn cached(&self) -> Option<Arc<[SensorRecord]>> {
        self.cache.read().await.clone()
    }

    /// Drops the cached table.
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
    }
}
