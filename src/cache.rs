// Copyright (c) 2025 - Cowboy AI, Inc.
//! Snack display cache
//!
//! Bounded, read-through cache of snack names and pictures, so purchase
//! rows don't look the snack up on every event. Safe to lose; entries are
//! overwritten whenever a snack row is saved.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::aggregate::Snack;
use crate::domain::AggregateKind;
use crate::projection::{ProjectionError, ProjectionResult};
use crate::runtime::AggregateHost;

/// Display fields of a snack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSnack {
    pub name: String,
    pub picture_url: Option<String>,
}

struct CacheInner {
    entries: HashMap<Uuid, CachedSnack>,
    order: VecDeque<Uuid>,
}

/// Bounded map; the oldest insertion is evicted first
pub struct SnackInfoCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl SnackInfoCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<CachedSnack> {
        self.inner.lock().await.entries.get(&id).cloned()
    }

    pub async fn put(&self, id: Uuid, snack: CachedSnack) {
        let mut inner = self.inner.lock().await;
        if inner.entries.insert(id, snack).is_none() {
            inner.order.push_back(id);
        }
        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Resolves a snack's display fields
#[async_trait]
pub trait SnackLookup: Send + Sync {
    /// # Errors
    ///
    /// `ProjectionError::MissingDependency` if the snack was never initialized
    async fn snack(&self, id: Uuid) -> ProjectionResult<CachedSnack>;
}

/// Cache in front of the snack host
pub struct CachedSnackLookup {
    cache: Arc<SnackInfoCache>,
    snacks: Arc<AggregateHost<Snack>>,
}

impl CachedSnackLookup {
    pub fn new(cache: Arc<SnackInfoCache>, snacks: Arc<AggregateHost<Snack>>) -> Self {
        Self { cache, snacks }
    }
}

#[async_trait]
impl SnackLookup for CachedSnackLookup {
    async fn snack(&self, id: Uuid) -> ProjectionResult<CachedSnack> {
        if let Some(hit) = self.cache.get(id).await {
            return Ok(hit);
        }

        debug!(snack_id = %id, "Snack cache miss");
        let snack = self
            .snacks
            .find(id)
            .await?
            .ok_or(ProjectionError::MissingDependency {
                kind: AggregateKind::Snack,
                id,
            })?;

        let cached = CachedSnack {
            name: snack.name,
            picture_url: snack.picture_url,
        };
        self.cache.put(id, cached.clone()).await;
        Ok(cached)
    }
}
