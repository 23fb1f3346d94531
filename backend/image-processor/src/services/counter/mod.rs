//! Processed-count record store
//!
//! The pipeline treats the per-array counter as write-only: it issues
//! "increment by one" and logs whatever count comes back. Serializing
//! concurrent increments on the same key is the record store's job.

pub mod dynamodb;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

pub use dynamodb::DynamoDbCounter;

/// Identifies one photo array inside one photo gallery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub group_id: String,
    pub array_id: String,
}

impl CounterKey {
    pub fn new(group_id: impl Into<String>, array_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            array_id: array_id.into(),
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_id, self.array_id)
    }
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Record store request failed: {0}")]
    Request(String),

    #[error("Record store returned no processed count")]
    MissingCount,
}

/// Atomic "+1" on the processed count of a photo array
#[async_trait]
pub trait ProcessedCounter: Send + Sync {
    /// Increment the count stored under `key` in `table`, returning the new value
    async fn increment(&self, table: &str, key: &CounterKey) -> Result<u64, CounterError>;
}

/// In-process counter keyed by `(table, key)`
#[derive(Debug, Default)]
pub struct MemoryCounter {
    counts: Mutex<HashMap<(String, CounterKey), u64>>,
}

impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count, zero when never incremented
    pub fn count(&self, table: &str, key: &CounterKey) -> u64 {
        self.lock()
            .get(&(table.to_string(), key.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Sum over every key in every table
    pub fn total(&self) -> u64 {
        self.lock().values().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, CounterKey), u64>> {
        self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProcessedCounter for MemoryCounter {
    async fn increment(&self, table: &str, key: &CounterKey) -> Result<u64, CounterError> {
        let mut counts = self.lock();
        let count = counts.entry((table.to_string(), key.clone())).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_counter_increments_per_key() {
        let counter = MemoryCounter::new();
        let a0 = CounterKey::new("test-gallery", "a0");
        let a1 = CounterKey::new("test-gallery", "a1");

        assert_eq!(counter.increment("PhotoGallery", &a0).await.unwrap(), 1);
        assert_eq!(counter.increment("PhotoGallery", &a0).await.unwrap(), 2);
        assert_eq!(counter.increment("PhotoGallery", &a1).await.unwrap(), 1);

        assert_eq!(counter.count("PhotoGallery", &a0), 2);
        assert_eq!(counter.count("Other", &a0), 0);
        assert_eq!(counter.total(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let counter = Arc::new(MemoryCounter::new());
        let key = CounterKey::new("g", "a");

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let counter = counter.clone();
                let key = key.clone();
                tokio::spawn(async move { counter.increment("t", &key).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(counter.count("t", &key), 32);
    }

    #[test]
    fn test_counter_key_display() {
        assert_eq!(CounterKey::new("g", "a0").to_string(), "g/a0");
    }
}
