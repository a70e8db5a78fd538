// Copyright (c) 2025 - Cowboy AI, Inc.
//! Aggregate Host
//!
//! "Get or create addressable unit by key": runs commands against aggregate
//! instances with one writer per key at a time.
//!
//! # Pipeline per command
//!
//! ```text
//! lock(key) → load state → validate/handle
//!                              │
//!              ┌── rejected ───┴── accepted ──┐
//!              ↓                               ↓
//!      publish ErrorEvent            envelope(version + 1) → apply → save
//!      return Rejected                         ↓
//!                                      publish (failure logged only)
//!                                              ↓
//!                                       return next state
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::state_store::StateStore;
use crate::aggregate::{Aggregate, CommandContext};
use crate::errors::{RuntimeError, RuntimeResult};
use crate::events::{ErrorEvent, EventEnvelope};
use crate::publisher::EventPublisher;

/// Outcome of a failed command execution
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Validation failed; nothing was committed
    #[error("Command rejected with code {code}: {}", .reasons.join("; "))]
    Rejected { code: u16, reasons: Vec<String> },

    /// Loading or saving state failed; nothing was committed
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ExecuteError {
    pub fn code(&self) -> Option<u16> {
        match self {
            ExecuteError::Rejected { code, .. } => Some(*code),
            ExecuteError::Runtime(_) => None,
        }
    }

    pub fn reasons(&self) -> Vec<String> {
        match self {
            ExecuteError::Rejected { reasons, .. } => reasons.clone(),
            ExecuteError::Runtime(e) => vec![e.to_string()],
        }
    }
}

/// Hosts every instance of one aggregate kind
pub struct AggregateHost<A: Aggregate> {
    store: Arc<dyn StateStore<A>>,
    publisher: Arc<dyn EventPublisher<A>>,
    locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<A: Aggregate> AggregateHost<A> {
    pub fn new(store: Arc<dyn StateStore<A>>, publisher: Arc<dyn EventPublisher<A>>) -> Self {
        Self {
            store,
            publisher,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    fn locks(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<Mutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.locks().entry(id).or_default())
    }

    /// Drop the key's lock once no other command holds or waits on it
    fn release_lock(&self, id: Uuid, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks();
        drop(lock);
        if locks.get(&id).is_some_and(|held| Arc::strong_count(held) == 1) {
            locks.remove(&id);
        }
    }

    /// Current state of an instance; a blank state if it never committed
    pub async fn state(&self, id: Uuid) -> RuntimeResult<A> {
        Ok(self.store.load(id).await?.unwrap_or_else(|| A::new(id)))
    }

    /// Current state only if the instance was ever initialized
    pub async fn find(&self, id: Uuid) -> RuntimeResult<Option<A>> {
        Ok(self.store.load(id).await?.filter(|state| state.is_created()))
    }

    /// Ids of every instance that ever committed, removed ones included
    pub async fn ids(&self) -> RuntimeResult<Vec<Uuid>> {
        self.store.ids().await
    }

    /// Run one command against the instance keyed by `id`
    ///
    /// Commands for the same key are serialized; different keys run in
    /// parallel.
    ///
    /// # Errors
    ///
    /// - `ExecuteError::Rejected` with the command's stable code and every
    ///   failure reason; an error event was published
    /// - `ExecuteError::Runtime` if state could not be loaded or saved
    pub async fn execute(
        &self,
        id: Uuid,
        command: A::Command,
        ctx: &CommandContext,
    ) -> Result<A, ExecuteError> {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            self.execute_locked(id, command, ctx).await
        };
        self.release_lock(id, lock);
        result
    }

    async fn execute_locked(
        &self,
        id: Uuid,
        command: A::Command,
        ctx: &CommandContext,
    ) -> Result<A, ExecuteError> {
        let state = self.state(id).await?;
        let code = A::error_code(&command).code();

        let event = match state.handle(command, ctx) {
            Ok(event) => event,
            Err(report) => {
                let reasons = report.reasons();
                warn!(
                    kind = %A::KIND,
                    aggregate_id = %id,
                    version = state.version(),
                    code,
                    reasons = ?reasons,
                    "Command rejected"
                );

                let error_event = ErrorEvent {
                    event_id: Uuid::now_v7(),
                    aggregate_id: id,
                    version: state.version(),
                    trace_id: ctx.trace_id,
                    operated_at: ctx.operated_at,
                    operated_by: ctx.operated_by.clone(),
                    code,
                    reasons: reasons.clone(),
                };
                if let Err(e) = self.publisher.publish_error(&error_event).await {
                    error!(aggregate_id = %id, error = %e, "Failed to publish error event");
                }

                return Err(ExecuteError::Rejected { code, reasons });
            }
        };

        let envelope = EventEnvelope {
            event_id: Uuid::now_v7(),
            aggregate_id: id,
            version: state.version() + 1,
            trace_id: ctx.trace_id,
            operated_at: ctx.operated_at,
            operated_by: ctx.operated_by.clone(),
            event,
        };

        let expected = state.version();
        let next = state.apply(&envelope);
        self.store.save(next.clone(), expected).await?;

        info!(
            kind = %A::KIND,
            aggregate_id = %id,
            version = envelope.version,
            event_type = envelope.event_type_name(),
            "Event committed"
        );

        if let Err(e) = self.publisher.publish_event(&envelope).await {
            error!(
                aggregate_id = %id,
                version = envelope.version,
                event_type = envelope.event_type_name(),
                error = %e,
                "Failed to publish committed event"
            );
        } else {
            debug!(aggregate_id = %id, version = envelope.version, "Event published");
        }

        Ok(next)
    }
}
