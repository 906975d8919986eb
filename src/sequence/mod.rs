//! Per-tenant, per-period sequence allocation.
//!
//! The allocator hands out serial numbers `1, 2, 3, ...` for each
//! `(tenant, period)` key. Counters are created lazily, only move forward,
//! and never hand out the same value twice, even under concurrent callers.
//! Numbers consumed by a failed operation are not returned.

mod database;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;

pub use database::DatabaseCounterStore;
pub use memory::MemoryCounterStore;

/// Result type for sequence operations.
pub type SequenceResult<T> = Result<T, SequenceError>;

/// Errors from counter stores.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("Invalid counter key: {0}")]
    InvalidKey(String),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Counter value out of range: {0}")]
    OutOfRange(i64),
}

/// Storage for keyed counters.
///
/// `increment` must be a single atomic increment-and-get: two concurrent
/// calls for the same key never observe the same value.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter (creating it at 0) and return the new value.
    async fn increment(&self, tenant_id: &str, period: &str) -> SequenceResult<u64>;

    /// Current value, 0 if the counter does not exist yet.
    async fn current(&self, tenant_id: &str, period: &str) -> SequenceResult<u64>;
}

/// Allocates sequence values from an injected [`CounterStore`].
#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Allocate the next value for `(tenant_id, period)`.
    pub async fn next_value(&self, tenant_id: &str, period: &str) -> SequenceResult<u64> {
        validate_key(tenant_id, period)?;
        self.store.increment(tenant_id, period).await
    }

    /// Last value handed out for the key, without allocating.
    pub async fn current_value(&self, tenant_id: &str, period: &str) -> SequenceResult<u64> {
        validate_key(tenant_id, period)?;
        self.store.current(tenant_id, period).await
    }
}

fn validate_key(tenant_id: &str, period: &str) -> SequenceResult<()> {
    if tenant_id.trim().is_empty() {
        return Err(SequenceError::InvalidKey("tenant id is empty".to_string()));
    }
    if period.trim().is_empty() {
        return Err(SequenceError::InvalidKey("period is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequential_allocation() {
        let allocator = SequenceAllocator::new(Arc::new(MemoryCounterStore::new()));
        assert_eq!(allocator.current_value("school-1", "2025").await.unwrap(), 0);
        assert_eq!(allocator.next_value("school-1", "2025").await.unwrap(), 1);
        assert_eq!(allocator.next_value("school-1", "2025").await.unwrap(), 2);
        assert_eq!(allocator.next_value("school-1", "2025").await.unwrap(), 3);
        assert_eq!(allocator.current_value("school-1", "2025").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let allocator = SequenceAllocator::new(Arc::new(MemoryCounterStore::new()));
        assert_eq!(allocator.next_value("school-1", "2025").await.unwrap(), 1);
        assert_eq!(allocator.next_value("school-2", "2025").await.unwrap(), 1);
        assert_eq!(allocator.next_value("school-1", "2026").await.unwrap(), 1);
        assert_eq!(allocator.next_value("school-1", "2025").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let allocator = SequenceAllocator::new(Arc::new(MemoryCounterStore::new()));
        assert!(matches!(
            allocator.next_value("", "2025").await,
            Err(SequenceError::InvalidKey(_))
        ));
        assert!(matches!(
            allocator.next_value("school-1", " ").await,
            Err(SequenceError::InvalidKey(_))
        ));
    }
}
