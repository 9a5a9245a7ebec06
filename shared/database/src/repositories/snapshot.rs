//! Snapshot Store
//!
//! Whole-document persistence of `OrderSnapshot`. Every write goes through an
//! exclusive section keyed by order id, so concurrent compiles of the same
//! order never interleave their load-modify-save cycles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use torvan_models::OrderSnapshot;
use torvan_utils::{PlanningError, PlanningResult};

/// Modification applied to the current snapshot (or `None` for a new order).
pub type SnapshotUpdate =
    Box<dyn FnOnce(Option<OrderSnapshot>) -> PlanningResult<OrderSnapshot> + Send>;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, order_id: &str) -> PlanningResult<Option<OrderSnapshot>>;

    /// Run `apply` on the stored snapshot and persist the result, holding the
    /// order's exclusive section throughout. The stored revision is bumped.
    async fn update(&self, order_id: &str, apply: SnapshotUpdate) -> PlanningResult<OrderSnapshot>;

    /// Overwrite the stored snapshot.
    async fn save(&self, snapshot: OrderSnapshot) -> PlanningResult<OrderSnapshot> {
        let order_id = snapshot.order_id().to_string();
        self.update(&order_id, Box::new(move |_| Ok(snapshot))).await
    }
}

fn check_order_id(order_id: &str, snapshot: &OrderSnapshot) -> PlanningResult<()> {
    if snapshot.order_id() != order_id {
        return Err(PlanningError::validation(
            "order_id",
            format!(
                "Snapshot for {} cannot be stored under {}",
                snapshot.order_id(),
                order_id
            ),
        ));
    }
    Ok(())
}

/// In-process store. Per-order `tokio` mutexes provide the exclusive section.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<String, OrderSnapshot>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn order_lock(&self, order_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the order's lock entry once no other caller holds or waits on it.
    /// Clones are only handed out under the map lock, so a count of two (the
    /// map and `lock`) means nobody else can be inside the section.
    async fn release_lock(&self, order_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(order_id);
        }
    }

    async fn update_locked(&self, order_id: &str, apply: SnapshotUpdate) -> PlanningResult<OrderSnapshot> {
        let current = self.snapshots.read().await.get(order_id).cloned();
        let previous_revision = current.as_ref().map_or(0, |s| s.metadata.revision);

        let mut next = apply(current)?;
        check_order_id(order_id, &next)?;
        next.metadata.revision = previous_revision;
        next.touch(Utc::now());

        self.snapshots
            .write()
            .await
            .insert(order_id.to_string(), next.clone());

        debug!(order_id = %order_id, revision = next.metadata.revision, "Snapshot stored");
        Ok(next)
    }

    #[cfg(test)]
    async fn tracked_locks(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, order_id: &str) -> PlanningResult<Option<OrderSnapshot>> {
        Ok(self.snapshots.read().await.get(order_id).cloned())
    }

    async fn update(&self, order_id: &str, apply: SnapshotUpdate) -> PlanningResult<OrderSnapshot> {
        let lock = self.order_lock(order_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.update_locked(order_id, apply).await
        };

        self.release_lock(order_id, lock).await;
        result
    }
}

/// PostgreSQL store: one JSONB row per order in `order_snapshots`. The
/// exclusive section is a transaction-scoped advisory lock on the order id.
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn load(&self, order_id: &str) -> PlanningResult<Option<OrderSnapshot>> {
        let row: Option<(Json<OrderSnapshot>,)> =
            sqlx::query_as("SELECT snapshot FROM order_snapshots WHERE order_id = $1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(snapshot,)| snapshot.0))
    }

    async fn update(&self, order_id: &str, apply: SnapshotUpdate) -> PlanningResult<OrderSnapshot> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        let row: Option<(Json<OrderSnapshot>,)> =
            sqlx::query_as("SELECT snapshot FROM order_snapshots WHERE order_id = $1")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = row.map(|(snapshot,)| snapshot.0);
        let previous_revision = current.as_ref().map_or(0, |s| s.metadata.revision);

        // An error here drops `tx`, which rolls back and releases the lock.
        let mut next = apply(current)?;
        check_order_id(order_id, &next)?;
        next.metadata.revision = previous_revision;
        next.touch(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO order_snapshots (order_id, revision, snapshot, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (order_id) DO UPDATE
            SET revision = EXCLUDED.revision,
                snapshot = EXCLUDED.snapshot,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(order_id)
        .bind(i64::try_from(next.metadata.revision).unwrap_or(i64::MAX))
        .bind(Json(&next))
        .bind(next.metadata.last_updated)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(order_id = %order_id, revision = next.metadata.revision, "Snapshot stored");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torvan_models::OrderDetails;

    fn snapshot(order_id: &str) -> OrderSnapshot {
        OrderSnapshot::new(
            OrderDetails {
                order_id: order_id.to_string(),
                build_numbers: vec!["B1".to_string()],
                ..Default::default()
            },
            "test",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemorySnapshotStore::new();
        assert!(store.load("ORD-1").await.unwrap().is_none());

        let saved = store.save(snapshot("ORD-1")).await.unwrap();
        assert_eq!(saved.metadata.revision, 1);
        assert!(saved.verify_integrity());

        let loaded = store.load("ORD-1").await.unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_revision_increments_per_write() {
        let store = MemorySnapshotStore::new();
        store.save(snapshot("ORD-1")).await.unwrap();

        let updated = store
            .update(
                "ORD-1",
                Box::new(|current| {
                    let mut snapshot = current.ok_or_else(|| PlanningError::not_found("ORD-1"))?;
                    snapshot.order_details.po_number = Some("PO-9".to_string());
                    Ok(snapshot)
                }),
            )
            .await
            .unwrap();

        assert_eq!(updated.metadata.revision, 2);
        assert_eq!(updated.order_details.po_number.as_deref(), Some("PO-9"));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_snapshot_untouched() {
        let store = MemorySnapshotStore::new();
        let saved = store.save(snapshot("ORD-1")).await.unwrap();

        let result = store
            .update("ORD-1", Box::new(|_| Err(PlanningError::internal("boom"))))
            .await;

        assert!(result.is_err());
        assert_eq!(store.load("ORD-1").await.unwrap().unwrap(), saved);
    }

    #[tokio::test]
    async fn test_mismatched_order_id_is_rejected() {
        let store = MemorySnapshotStore::new();
        let result = store
            .update("ORD-1", Box::new(|_| Ok(snapshot("ORD-2"))))
            .await;

        assert_eq!(result.unwrap_err().error_code(), "VALIDATION_ERROR");
        assert!(store.load("ORD-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let store = Arc::new(MemorySnapshotStore::new());
        store.save(snapshot("ORD-1")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        "ORD-1",
                        Box::new(move |current| {
                            let mut snapshot =
                                current.ok_or_else(|| PlanningError::not_found("ORD-1"))?;
                            snapshot.shipping_data.notes.push(format!("note {}", i));
                            Ok(snapshot)
                        }),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.load("ORD-1").await.unwrap().unwrap();
        assert_eq!(stored.shipping_data.notes.len(), 16);
        assert_eq!(stored.metadata.revision, 17);
        assert_eq!(store.tracked_locks().await, 0);
    }

    #[tokio::test]
    async fn test_failed_update_releases_order_lock() {
        let store = MemorySnapshotStore::new();
        let error = store
            .update(
                "ORD-404",
                Box::new(|current| current.ok_or_else(|| PlanningError::not_found("ORD-404"))),
            )
            .await
            .unwrap_err();

        assert_eq!(error.error_code(), "NOT_FOUND");
        assert_eq!(store.tracked_locks().await, 0);
    }
}
