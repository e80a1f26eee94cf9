use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};

use crate::{
    sensor::{NewReading, Reading, Summary},
    store::ReadingStore,
};

/// In-process store with the same id and ordering rules as `data_sensor`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: u64,
    readings: Vec<Reading>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.readings.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored reading in id order.
    pub fn readings(&self) -> Result<Vec<Reading>> {
        Ok(self.lock()?.readings.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl ReadingStore for MemoryStore {
    async fn insert_reading(&self, reading: &NewReading) -> Result<u64> {
        let mut inner = self.lock()?;
        inner.last_id += 1;
        let id = inner.last_id;
        inner.readings.push(Reading {
            id,
            suhu: reading.suhu,
            humidity: reading.humidity,
            lux: reading.lux,
            timestamp: reading.timestamp,
        });

        Ok(id)
    }

    async fn latest_readings(&self, limit: u32) -> Result<Vec<Reading>> {
        let inner = self.lock()?;

        Ok(inner
            .readings
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn summary(&self) -> Result<Summary> {
        Ok(Summary::from_readings(&self.lock()?.readings))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn new_reading(suhu: f64) -> NewReading {
        NewReading {
            suhu,
            humidity: 50.0,
            lux: 200.0,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert_reading(&new_reading(1.0)).await.unwrap();
        let b = store.insert_reading(&new_reading(2.0)).await.unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn latest_returns_oldest_rows_first() {
        let store = MemoryStore::new();
        for i in 0..10 {
            store.insert_reading(&new_reading(i as f64)).await.unwrap();
        }

        let rows = store.latest_readings(3).await.unwrap();
        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(store.latest_readings(100).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn clones_share_rows() {
        let store = MemoryStore::new();
        let other = store.clone();
        other.insert_reading(&new_reading(3.0)).await.unwrap();
        assert_eq!(store.summary().await.unwrap().suhumax, Some(3.0));
    }
}
