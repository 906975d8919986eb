//! In-memory counter store for single-process use and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CounterStore, SequenceResult};

/// Counters held in a mutex-guarded map. The lock covers only the
/// increment itself.
#[derive(Clone, Default)]
pub struct MemoryCounterStore {
    counters: Arc<Mutex<HashMap<(String, String), u64>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, tenant_id: &str, period: &str) -> SequenceResult<u64> {
        let mut counters = self.counters.lock().await;
        let value = counters
            .entry((tenant_id.to_string(), period.to_string()))
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn current(&self, tenant_id: &str, period: &str) -> SequenceResult<u64> {
        let counters = self.counters.lock().await;
        Ok(counters
            .get(&(tenant_id.to_string(), period.to_string()))
            .copied()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_unique() {
        let store = MemoryCounterStore::new();
        store.increment("school-1", "2025").await.unwrap();

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment("school-1", "2025").await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        assert_eq!(seen, (2..=65).collect::<HashSet<u64>>());
        assert_eq!(store.current("school-1", "2025").await.unwrap(), 65);
    }
}
