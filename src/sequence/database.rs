//! Database-backed counter store.
//!
//! Each increment is one `INSERT ... ON CONFLICT DO UPDATE ... RETURNING`
//! statement, so the database serializes concurrent writers for the same
//! key and no read-then-write window exists.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel_async::RunQueryDsl;

use super::{CounterStore, SequenceError, SequenceResult};
use crate::repository::DbPool;
use crate::schema::sequence_counters;
use crate::{with_conn, with_conn_split};

#[derive(QueryableByName)]
struct CounterValue {
    #[diesel(sql_type = BigInt)]
    value: i64,
}

fn to_u64(value: i64) -> SequenceResult<u64> {
    u64::try_from(value).map_err(|_| SequenceError::OutOfRange(value))
}

/// Counters persisted in the `sequence_counters` table.
#[derive(Clone)]
pub struct DatabaseCounterStore {
    pool: DbPool,
}

impl DatabaseCounterStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for DatabaseCounterStore {
    async fn increment(&self, tenant_id: &str, period: &str) -> SequenceResult<u64> {
        let row: CounterValue = with_conn_split!(self.pool,
            sqlite: conn => {
                diesel::sql_query(
                    "INSERT INTO sequence_counters (tenant_id, period, value) VALUES (?, ?, 1) \
                     ON CONFLICT (tenant_id, period) \
                     DO UPDATE SET value = sequence_counters.value + 1 \
                     RETURNING value",
                )
                .bind::<Text, _>(tenant_id)
                .bind::<Text, _>(period)
                .get_result(&mut conn)
                .await?
            },
            postgres: conn => {
                diesel::sql_query(
                    "INSERT INTO sequence_counters (tenant_id, period, value) VALUES ($1, $2, 1) \
                     ON CONFLICT (tenant_id, period) \
                     DO UPDATE SET value = sequence_counters.value + 1 \
                     RETURNING value",
                )
                .bind::<Text, _>(tenant_id)
                .bind::<Text, _>(period)
                .get_result(&mut conn)
                .await?
            }
        );
        to_u64(row.value)
    }

    async fn current(&self, tenant_id: &str, period: &str) -> SequenceResult<u64> {
        let value: Option<i64> = with_conn!(self.pool, conn => {
            sequence_counters::table
                .filter(sequence_counters::tenant_id.eq(tenant_id))
                .filter(sequence_counters::period.eq(period))
                .select(sequence_counters::value)
                .first(&mut conn)
                .await
                .optional()?
        });
        to_u64(value.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use crate::sequence::SequenceAllocator;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn setup() -> (DatabaseCounterStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (ctx.counters(), dir)
    }

    #[tokio::test]
    async fn test_counter_starts_at_one_and_persists() {
        let (store, _dir) = setup().await;
        let allocator = SequenceAllocator::new(Arc::new(store.clone()));

        assert_eq!(allocator.current_value("school-1", "2025").await.unwrap(), 0);
        assert_eq!(allocator.next_value("school-1", "2025").await.unwrap(), 1);
        assert_eq!(allocator.next_value("school-1", "2025").await.unwrap(), 2);
        assert_eq!(allocator.next_value("school-1", "2025").await.unwrap(), 3);
        assert_eq!(allocator.next_value("school-2", "2025").await.unwrap(), 1);

        assert_eq!(store.current("school-1", "2025").await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_unique() {
        let (store, _dir) = setup().await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment("school-1", "2025").await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        assert_eq!(seen, (1..=16).collect::<HashSet<u64>>());
    }
}
