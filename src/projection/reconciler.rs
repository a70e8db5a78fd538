// Copyright (c) 2025 - Cowboy AI, Inc.
//! Full-Rebuild Reconciler
//!
//! Recomputes one row from the aggregate's authoritative snapshot, ignoring
//! event deltas, and overwrites the stored row in one conditional write.
//!
//! # Algorithm
//!
//! ```text
//! for attempt in 1..=max_attempts:
//!     etag     ← store.get(id)
//!     snapshot ← source.snapshot(id)        (aggregate state + cross-aggregate counters)
//!     None     → delete row if present, stop
//!     Some(r)  → store.upsert(r, etag)
//!                  Ok        → notice "saved", stop
//!                  Conflict  → sleep(attempt × unit), retry
//!                  other     → stop
//! exhausted → log, stop (row stays stale until the next drift scan)
//! ```
//!
//! `rebuild` never returns an error: every path ends in a [`RebuildOutcome`].
//! It is idempotent because it always writes the current snapshot.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::notice::{notify_or_log, NoticeSink, ProjectionNotice};
use super::store::{ProjectionStore, StoreError};
use super::{ProjectionError, ProjectionResult, ProjectionRow};
use crate::events::ErrorCode;

/// Authoritative snapshots of one row type
#[async_trait]
pub trait SnapshotSource<R: ProjectionRow>: Send + Sync {
    /// Row built from the aggregate's current state, `None` if the
    /// aggregate was never initialized
    async fn snapshot(&self, id: Uuid) -> ProjectionResult<Option<R>>;

    /// Ids of every initialized source aggregate
    async fn ids(&self) -> ProjectionResult<Vec<Uuid>>;
}

/// Bounded linear backoff for write conflicts
///
/// After failed attempt N the reconciler waits N × `delay_unit`. No jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_unit: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.delay_unit.saturating_mul(attempt)
    }
}

/// Result of one rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Row overwritten with the snapshot at this version
    Saved { version: u64 },

    /// Source absent; the row was deleted
    Removed,

    /// Source absent and no row existed
    Absent,

    /// Gave up; the row was left as it was
    Failed { attempts: u32, reason: String },
}

impl RebuildOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RebuildOutcome::Failed { .. })
    }
}

/// Rebuilds rows of one projection
pub struct Reconciler<R: ProjectionRow> {
    source: Arc<dyn SnapshotSource<R>>,
    store: Arc<dyn ProjectionStore<R>>,
    notices: Arc<dyn NoticeSink>,
    policy: RetryPolicy,
}

enum Attempt {
    Done(RebuildOutcome),
    Conflict(StoreError),
    Fatal(ProjectionError),
}

impl<R: ProjectionRow> Reconciler<R> {
    pub fn new(
        source: Arc<dyn SnapshotSource<R>>,
        store: Arc<dyn ProjectionStore<R>>,
        notices: Arc<dyn NoticeSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            store,
            notices,
            policy,
        }
    }

    pub fn source(&self) -> &Arc<dyn SnapshotSource<R>> {
        &self.source
    }

    pub fn store(&self) -> &Arc<dyn ProjectionStore<R>> {
        &self.store
    }

    pub fn notices(&self) -> &Arc<dyn NoticeSink> {
        &self.notices
    }

    /// Rebuild the row for one aggregate id
    pub async fn rebuild(&self, id: Uuid) -> RebuildOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_conflict = None;

        for attempt in 1..=max_attempts {
            match self.attempt(id).await {
                Attempt::Done(outcome) => {
                    debug!(kind = %R::KIND, aggregate_id = %id, attempt, ?outcome, "Rebuild finished");
                    return outcome;
                }
                Attempt::Conflict(e) => {
                    warn!(
                        kind = %R::KIND,
                        aggregate_id = %id,
                        attempt,
                        error = %e,
                        "Rebuild lost a write race"
                    );
                    last_conflict = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    }
                }
                Attempt::Fatal(e) => {
                    error!(kind = %R::KIND, aggregate_id = %id, attempt, error = %e, "Rebuild failed");
                    return self.fail(id, attempt, e.to_string()).await;
                }
            }
        }

        let reason = last_conflict
            .map(|e| e.to_string())
            .unwrap_or_else(|| "retries exhausted".to_string());
        error!(
            kind = %R::KIND,
            aggregate_id = %id,
            attempts = max_attempts,
            reason = %reason,
            "Rebuild gave up; row left stale"
        );
        self.fail(id, max_attempts, reason).await
    }

    async fn attempt(&self, id: Uuid) -> Attempt {
        let current = match self.store.get(id).await {
            Ok(current) => current,
            Err(e) => return Attempt::Fatal(e.into()),
        };

        let snapshot = match self.source.snapshot(id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Attempt::Fatal(e),
        };

        let Some(row) = snapshot else {
            if current.is_none() {
                return Attempt::Done(RebuildOutcome::Absent);
            }
            return match self.store.delete(id).await {
                Ok(_) => {
                    info!(kind = %R::KIND, aggregate_id = %id, "Row removed; source absent");
                    notify_or_log(self.notices.as_ref(), R::removed(id)).await;
                    Attempt::Done(RebuildOutcome::Removed)
                }
                Err(e) => Attempt::Fatal(e.into()),
            };
        };

        let version = row.version();
        match self.store.upsert(row.clone(), current.map(|c| c.etag)).await {
            Ok(_) => {
                info!(kind = %R::KIND, aggregate_id = %id, version, "Row rebuilt");
                notify_or_log(self.notices.as_ref(), row.saved()).await;
                Attempt::Done(RebuildOutcome::Saved { version })
            }
            Err(e @ StoreError::Conflict { .. }) => Attempt::Conflict(e),
            Err(e) => Attempt::Fatal(e.into()),
        }
    }

    async fn fail(&self, id: Uuid, attempts: u32, reason: String) -> RebuildOutcome {
        notify_or_log(
            self.notices.as_ref(),
            ProjectionNotice::failure(id, 0, ErrorCode::ProjectionRebuild, vec![reason.clone()]),
        )
        .await;
        RebuildOutcome::Failed { attempts, reason }
    }
}
