mod memory;

use std::future::Future;

use anyhow::Result;

use crate::sensor::{NewReading, Reading, Summary};

pub use memory::MemoryStore;

/// Handle to wherever readings are persisted.
///
/// Built once at startup and cloned into the HTTP state and the bridge.
pub trait ReadingStore: Clone + Send + Sync + 'static {
    /// Inserts a reading and returns the id assigned by the store.
    fn insert_reading(&self, reading: &NewReading) -> impl Future<Output = Result<u64>> + Send;

    /// The `limit` readings with the smallest ids, in ascending id order.
    fn latest_readings(&self, limit: u32) -> impl Future<Output = Result<Vec<Reading>>> + Send;

    fn summary(&self) -> impl Future<Output = Result<Summary>> + Send;
}
