// Copyright (c) 2025 - Cowboy AI, Inc.
//! Incremental Projector
//!
//! Applies each event of a per-key stream to its row, but only when the row
//! is exactly one version behind. Everything else defers to a full rebuild.
//!
//! # State machine per event
//!
//! ```text
//! locate row
//!   ├─ absent  + initializing      → create row from event
//!   ├─ absent  + non-initializing  → rebuild
//!   └─ present
//!        ├─ row.version == v − 1   → apply delta, row.version = v
//!        └─ otherwise              → rebuild
//! any failure along the way        → log, error notice, rebuild
//! ```
//!
//! A duplicate delivery finds `row.version == v` and rebuilds, which writes
//! the same snapshot again.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::notice::{notify_or_log, NoticeSink, ProjectionNotice};
use super::reconciler::{RebuildOutcome, Reconciler};
use super::store::ProjectionStore;
use super::{ProjectionError, ProjectionResult, ProjectionRow};
use crate::events::{DomainEvent, ErrorCode, EventEnvelope, StreamMessage};

/// Pure mapping of one aggregate kind's events onto its row
#[async_trait]
pub trait RowProjection: Send + Sync + 'static {
    type Event: DomainEvent;
    type Row: ProjectionRow;

    /// Row for an initializing event
    async fn create(&self, envelope: &EventEnvelope<Self::Event>) -> ProjectionResult<Self::Row>;

    /// Row after applying a non-initializing event's delta
    ///
    /// Implementations set every changed field except `version`, which the
    /// projector stamps.
    async fn apply(
        &self,
        row: Self::Row,
        envelope: &EventEnvelope<Self::Event>,
    ) -> ProjectionResult<Self::Row>;

    /// Stamp the version a row reflects
    fn stamp(row: Self::Row, version: u64) -> Self::Row;
}

/// What happened to one delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Row created from an initializing event
    Created { version: u64 },

    /// Delta applied onto the previous version
    Applied { version: u64 },

    /// Incremental apply was unsafe; the reconciler ran instead
    Rebuilt(RebuildOutcome),

    /// Error events carry nothing to project
    Skipped,
}

/// Incremental projector for one aggregate kind
pub struct IncrementalProjector<P: RowProjection> {
    projection: P,
    store: Arc<dyn ProjectionStore<P::Row>>,
    reconciler: Arc<Reconciler<P::Row>>,
    notices: Arc<dyn NoticeSink>,
}

impl<P: RowProjection> IncrementalProjector<P> {
    pub fn new(
        projection: P,
        store: Arc<dyn ProjectionStore<P::Row>>,
        reconciler: Arc<Reconciler<P::Row>>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            projection,
            store,
            reconciler,
            notices,
        }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler<P::Row>> {
        &self.reconciler
    }

    /// Handle one message from the per-key stream
    pub async fn handle(&self, message: &StreamMessage<P::Event>) -> ApplyOutcome {
        match message {
            StreamMessage::Event(envelope) => self.handle_event(envelope).await,
            StreamMessage::Error(error) => {
                debug!(
                    aggregate_id = %error.aggregate_id,
                    code = error.code,
                    "Skipping rejected command"
                );
                ApplyOutcome::Skipped
            }
        }
    }

    /// Apply one committed event, or fall back to rebuild
    pub async fn handle_event(&self, envelope: &EventEnvelope<P::Event>) -> ApplyOutcome {
        let id = envelope.aggregate_id;

        match self.try_apply(envelope).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => ApplyOutcome::Rebuilt(self.reconciler.rebuild(id).await),
            Err(e) => {
                error!(
                    kind = %<P::Row as ProjectionRow>::KIND,
                    aggregate_id = %id,
                    version = envelope.version,
                    event_type = envelope.event_type_name(),
                    error = %e,
                    "Incremental apply failed"
                );
                notify_or_log(
                    self.notices.as_ref(),
                    ProjectionNotice::failure(
                        id,
                        envelope.version,
                        ErrorCode::ProjectionApply,
                        vec![e.to_string()],
                    ),
                )
                .await;
                ApplyOutcome::Rebuilt(self.reconciler.rebuild(id).await)
            }
        }
    }

    /// `Ok(None)` means the version check failed
    async fn try_apply(
        &self,
        envelope: &EventEnvelope<P::Event>,
    ) -> ProjectionResult<Option<ApplyOutcome>> {
        let id = envelope.aggregate_id;
        let version = envelope.version;
        let stored = self.store.get(id).await?;

        let (row, expected, outcome) = match stored {
            None if envelope.event.is_initializing() => {
                let row = self.projection.create(envelope).await?;
                (row, None, ApplyOutcome::Created { version })
            }
            None => {
                warn!(
                    aggregate_id = %id,
                    version,
                    event_type = envelope.event_type_name(),
                    "Row missing for non-initializing event"
                );
                return Ok(None);
            }
            Some(stored) if stored.row.version() + 1 == version => {
                let row = self.projection.apply(stored.row, envelope).await?;
                (row, Some(stored.etag), ApplyOutcome::Applied { version })
            }
            Some(stored) => {
                warn!(
                    aggregate_id = %id,
                    row_version = stored.row.version(),
                    version,
                    event_type = envelope.event_type_name(),
                    "Version mismatch"
                );
                return Ok(None);
            }
        };

        let row = P::stamp(row, version);
        self.store
            .upsert(row.clone(), expected)
            .await
            .map_err(ProjectionError::from)?;

        debug!(
            aggregate_id = %id,
            version,
            event_type = envelope.event_type_name(),
            "Row updated incrementally"
        );
        notify_or_log(self.notices.as_ref(), row.saved()).await;

        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Money;
    use crate::errors::RuntimeResult;
    use crate::events::MachineEvent;
    use crate::projection::machine::MachineProjection;
    use crate::projection::reconciler::{RetryPolicy, SnapshotSource};
    use crate::projection::store::InMemoryProjectionStore;
    use crate::projection::MachineInfo;
    use chrono::Utc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    /// Snapshot source returning whatever row the test put in
    #[derive(Default)]
    struct Snapshots(Mutex<Option<MachineInfo>>);

    #[async_trait]
    impl SnapshotSource<MachineInfo> for Snapshots {
        async fn snapshot(&self, _id: Uuid) -> ProjectionResult<Option<MachineInfo>> {
            Ok(self.0.lock().await.clone())
        }

        async fn ids(&self) -> ProjectionResult<Vec<Uuid>> {
            Ok(self.0.lock().await.iter().map(|row| row.id).collect())
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<ProjectionNotice>>);

    #[async_trait]
    impl NoticeSink for RecordingSink {
        async fn notify(&self, notice: ProjectionNotice) -> RuntimeResult<()> {
            self.0.lock().await.push(notice);
            Ok(())
        }
    }

    struct Harness {
        id: Uuid,
        store: Arc<InMemoryProjectionStore<MachineInfo>>,
        snapshots: Arc<Snapshots>,
        projector: IncrementalProjector<MachineProjection>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryProjectionStore::<MachineInfo>::new());
        let snapshots = Arc::new(Snapshots::default());
        let sink = Arc::new(RecordingSink::default());
        let reconciler = Arc::new(Reconciler::new(
            snapshots.clone(),
            store.clone(),
            sink.clone(),
            RetryPolicy {
                max_attempts: 3,
                delay_unit: Duration::from_millis(1),
            },
        ));
        Harness {
            id: Uuid::now_v7(),
            projector: IncrementalProjector::new(MachineProjection, store.clone(), reconciler, sink),
            store,
            snapshots,
        }
    }

    fn envelope(id: Uuid, version: u64, event: MachineEvent) -> EventEnvelope<MachineEvent> {
        EventEnvelope {
            event_id: Uuid::now_v7(),
            aggregate_id: id,
            version,
            trace_id: Uuid::now_v7(),
            operated_at: Utc::now(),
            operated_by: "operator".to_string(),
            event,
        }
    }

    fn initialized(id: Uuid) -> EventEnvelope<MachineEvent> {
        envelope(
            id,
            1,
            MachineEvent::Initialized {
                slots: vec![],
                money_inside: Money::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_create_then_apply_in_order() {
        let h = harness();

        let created = h.projector.handle_event(&initialized(h.id)).await;
        let applied = h
            .projector
            .handle_event(&envelope(h.id, 2, MachineEvent::SlotAdded { slot: crate::domain::Slot::empty(1) }))
            .await;

        assert_eq!(created, ApplyOutcome::Created { version: 1 });
        assert_eq!(applied, ApplyOutcome::Applied { version: 2 });
        let row = h.store.get(h.id).await.unwrap().unwrap().row;
        assert_eq!(row.version, 2);
        assert_eq!(row.slot_count, 1);
    }

    #[tokio::test]
    async fn test_version_gap_rebuilds_from_snapshot() {
        // Arrange: row at v1, snapshot already at v3
        let h = harness();
        h.projector.handle_event(&initialized(h.id)).await;
        let mut snapshot = h.store.get(h.id).await.unwrap().unwrap().row;
        snapshot.version = 3;
        snapshot.bought_count = 7;
        *h.snapshots.0.lock().await = Some(snapshot);

        // Act: v3 arrives while v2 was missed
        let outcome = h
            .projector
            .handle_event(&envelope(h.id, 3, MachineEvent::SlotRemoved { position: 9 }))
            .await;

        // Assert
        assert_eq!(outcome, ApplyOutcome::Rebuilt(RebuildOutcome::Saved { version: 3 }));
        let row = h.store.get(h.id).await.unwrap().unwrap().row;
        assert_eq!(row.version, 3);
        assert_eq!(row.bought_count, 7);
    }

    #[tokio::test]
    async fn test_non_initializing_event_without_row_rebuilds() {
        let h = harness();

        let outcome = h
            .projector
            .handle_event(&envelope(h.id, 2, MachineEvent::SlotRemoved { position: 1 }))
            .await;

        assert_eq!(outcome, ApplyOutcome::Rebuilt(RebuildOutcome::Absent));
        assert!(h.store.get(h.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_error_messages_are_skipped() {
        let h = harness();
        let message: StreamMessage<MachineEvent> = StreamMessage::Error(crate::events::ErrorEvent {
            event_id: Uuid::now_v7(),
            aggregate_id: h.id,
            version: 0,
            trace_id: Uuid::now_v7(),
            operated_at: Utc::now(),
            operated_by: "operator".to_string(),
            code: ErrorCode::MachineRemove.code(),
            reasons: vec!["Machine is not initialized".to_string()],
        });

        assert_eq!(h.projector.handle(&message).await, ApplyOutcome::Skipped);
    }
}
