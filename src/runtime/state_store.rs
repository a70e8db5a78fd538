// Copyright (c) 2025 - Cowboy AI, Inc.
//! Per-unit state storage
//!
//! Durable storage for the current state of each aggregate instance, with
//! an optimistic version check on save.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::errors::{RuntimeError, RuntimeResult};

/// Storage for aggregate states
#[async_trait]
pub trait StateStore<A: Aggregate>: Send + Sync {
    /// Current state, `None` if never saved
    async fn load(&self, id: Uuid) -> RuntimeResult<Option<A>>;

    /// Save a state that was derived from `expected_version`
    ///
    /// # Errors
    ///
    /// `RuntimeError::Concurrency` when the stored version is not
    /// `expected_version`.
    async fn save(&self, state: A, expected_version: u64) -> RuntimeResult<()>;

    /// Ids of every saved state, removed ones included
    async fn ids(&self) -> RuntimeResult<Vec<Uuid>>;
}

/// In-memory [`StateStore`]
pub struct InMemoryStateStore<A> {
    states: Arc<RwLock<HashMap<Uuid, A>>>,
}

impl<A> Default for InMemoryStateStore<A> {
    fn default() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<A> InMemoryStateStore<A> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<A: Aggregate> StateStore<A> for InMemoryStateStore<A> {
    async fn load(&self, id: Uuid) -> RuntimeResult<Option<A>> {
        Ok(self.states.read().await.get(&id).cloned())
    }

    async fn save(&self, state: A, expected_version: u64) -> RuntimeResult<()> {
        let mut states = self.states.write().await;
        let stored = states.get(&state.id()).map_or(0, Aggregate::version);

        if stored != expected_version {
            return Err(RuntimeError::Concurrency {
                key: state.id(),
                expected: expected_version,
                actual: stored,
            });
        }

        states.insert(state.id(), state);
        Ok(())
    }

    async fn ids(&self) -> RuntimeResult<Vec<Uuid>> {
        Ok(self.states.read().await.keys().copied().collect())
    }
}
