// Copyright (c) 2025 - Cowboy AI, Inc.
//! Projection Store
//!
//! One mutable table per row type, keyed by aggregate id. Every write gets
//! a fresh concurrency token (etag); a write carrying a stale token fails
//! with [`StoreError::Conflict`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::query::{Page, Query};
use super::ProjectionRow;

/// Errors from the projection store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another writer changed the row since it was read
    #[error("Write conflict on row {id}: expected etag {expected:?}, found {actual:?}")]
    Conflict {
        id: Uuid,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A row with its concurrency token
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<R> {
    pub row: R,
    pub etag: u64,
}

/// Row storage for one projection
#[async_trait]
pub trait ProjectionStore<R: ProjectionRow>: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Stored<R>>>;

    /// Write a whole row
    ///
    /// `expected` is the etag the write was derived from, or `None` when the
    /// row must not exist yet. Returns the new etag.
    async fn upsert(&self, row: R, expected: Option<u64>) -> StoreResult<u64>;

    /// Hard delete; returns whether a row was removed
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn ids(&self) -> StoreResult<Vec<Uuid>>;

    async fn all(&self) -> StoreResult<Vec<R>>;

    /// Filter, sort, search and page over every row
    async fn query(&self, query: &Query<R>) -> StoreResult<Page<R>> {
        Ok(query.run(self.all().await?))
    }
}

/// In-memory [`ProjectionStore`]
pub struct InMemoryProjectionStore<R> {
    rows: Arc<RwLock<HashMap<Uuid, Stored<R>>>>,
    next_etag: AtomicU64,
    _row: PhantomData<fn() -> R>,
}

impl<R> Default for InMemoryProjectionStore<R> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            next_etag: AtomicU64::new(1),
            _row: PhantomData,
        }
    }
}

impl<R> InMemoryProjectionStore<R> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<R: ProjectionRow> ProjectionStore<R> for InMemoryProjectionStore<R> {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Stored<R>>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn upsert(&self, row: R, expected: Option<u64>) -> StoreResult<u64> {
        let id = row.id();
        let mut rows = self.rows.write().await;
        let actual = rows.get(&id).map(|stored| stored.etag);

        if actual != expected {
            return Err(StoreError::Conflict {
                id,
                expected,
                actual,
            });
        }

        let etag = self.next_etag.fetch_add(1, Ordering::Relaxed);
        rows.insert(id, Stored { row, etag });
        Ok(etag)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn ids(&self) -> StoreResult<Vec<Uuid>> {
        Ok(self.rows.read().await.keys().copied().collect())
    }

    async fn all(&self) -> StoreResult<Vec<R>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .map(|stored| stored.row.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::PurchaseInfo;

    fn purchase(id: Uuid, version: u64) -> PurchaseInfo {
        PurchaseInfo {
            id,
            version,
            machine_id: Uuid::nil(),
            position: 1,
            snack_id: Uuid::nil(),
            snack_name: "Chips".to_string(),
            snack_picture_url: None,
            bought_price: 2,
            bought_at: None,
            bought_by: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_requires_current_etag() {
        let store = InMemoryProjectionStore::<PurchaseInfo>::new();
        let id = Uuid::now_v7();

        let etag = store.upsert(purchase(id, 1), None).await.unwrap();

        let duplicate_create = store.upsert(purchase(id, 1), None).await;
        assert!(matches!(duplicate_create, Err(StoreError::Conflict { .. })));

        let next = store.upsert(purchase(id, 2), Some(etag)).await.unwrap();
        assert_ne!(next, etag);

        let stale = store.upsert(purchase(id, 3), Some(etag)).await;
        assert_eq!(
            stale,
            Err(StoreError::Conflict {
                id,
                expected: Some(etag),
                actual: Some(next)
            })
        );

        assert_eq!(store.get(id).await.unwrap().unwrap().row.version, 2);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let store = InMemoryProjectionStore::<PurchaseInfo>::new();
        let id = Uuid::now_v7();
        store.upsert(purchase(id, 1), None).await.unwrap();

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert!(store.ids().await.unwrap().is_empty());
    }
}
