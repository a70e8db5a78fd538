// Copyright (c) 2025 - Cowboy AI, Inc.
//! Drift scanner / synchronizer
//!
//! Compares the ids in a projection store with the ids of the source
//! aggregates and repairs the difference:
//!
//! ```text
//! orphans  = store ids − source ids   → delete row
//! missing  = source ids − store ids   → rebuild       (differences only)
//! all      = source ids               → rebuild       (full)
//! ```
//!
//! Store ids are listed before source ids. Source ids never disappear, so a
//! row written between the two reads still finds its source. Each orphan is
//! re-checked against its snapshot before the delete.
//!
//! Rebuilds fan out with bounded concurrency. A failure on one id lands in
//! the [`SyncReport`]; only a failure to list ids fails the scan.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::projection::notice::notify_or_log;
use crate::projection::{ProjectionResult, ProjectionRow, RebuildOutcome, Reconciler};

/// What one scan did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Orphan rows deleted
    pub deleted: Vec<Uuid>,

    /// Rows rebuilt (or removed because the source vanished meanwhile)
    pub rebuilt: Vec<Uuid>,

    pub failed: Vec<(Uuid, String)>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, id: Uuid, outcome: RebuildOutcome) {
        match outcome {
            RebuildOutcome::Failed { reason, .. } => self.failed.push((id, reason)),
            RebuildOutcome::Saved { .. } | RebuildOutcome::Removed | RebuildOutcome::Absent => {
                self.rebuilt.push(id)
            }
        }
    }
}

/// Drift repair entry points, independent of the row type
#[async_trait]
pub trait Resync: Send + Sync {
    /// Name used for reminders and logs
    fn projection_name(&self) -> &str;

    /// Delete the row if the source is absent, rebuild it otherwise
    async fn sync_one(&self, id: Uuid) -> RebuildOutcome;

    async fn sync_differences_only(&self) -> ProjectionResult<SyncReport>;

    async fn sync_all(&self) -> ProjectionResult<SyncReport>;
}

pub struct Synchronizer<R: ProjectionRow> {
    name: String,
    reconciler: Arc<Reconciler<R>>,
    max_concurrency: usize,
}

impl<R: ProjectionRow> Synchronizer<R> {
    pub fn new(name: impl Into<String>, reconciler: Arc<Reconciler<R>>, max_concurrency: usize) -> Self {
        Self {
            name: name.into(),
            reconciler,
            max_concurrency: max_concurrency.max(1),
        }
    }

    async fn scan(&self, full: bool) -> ProjectionResult<SyncReport> {
        let store_ids: HashSet<Uuid> = self.reconciler.store().ids().await?.into_iter().collect();
        let mut source_ids: HashSet<Uuid> =
            self.reconciler.source().ids().await?.into_iter().collect();

        let mut report = SyncReport::default();

        let candidates: Vec<Uuid> = store_ids.difference(&source_ids).copied().collect();
        for id in candidates {
            match self.reconciler.source().snapshot(id).await {
                Ok(None) => {}
                Ok(Some(_)) => {
                    debug!(projection = %self.name, row_id = %id, "Source appeared during scan");
                    source_ids.insert(id);
                    continue;
                }
                Err(e) => {
                    error!(projection = %self.name, row_id = %id, error = %e, "Orphan check failed");
                    report.failed.push((id, e.to_string()));
                    continue;
                }
            }

            match self.reconciler.store().delete(id).await {
                Ok(_) => {
                    debug!(projection = %self.name, row_id = %id, "Orphan row deleted");
                    notify_or_log(self.reconciler.notices().as_ref(), R::removed(id)).await;
                    report.deleted.push(id);
                }
                Err(e) => {
                    error!(projection = %self.name, row_id = %id, error = %e, "Orphan delete failed");
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        let targets: Vec<Uuid> = if full {
            source_ids.into_iter().collect()
        } else {
            source_ids.difference(&store_ids).copied().collect()
        };

        let outcomes: Vec<(Uuid, RebuildOutcome)> = stream::iter(targets)
            .map(|id| async move { (id, self.reconciler.rebuild(id).await) })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for (id, outcome) in outcomes {
            report.record(id, outcome);
        }

        info!(
            projection = %self.name,
            full,
            deleted = report.deleted.len(),
            rebuilt = report.rebuilt.len(),
            failed = report.failed.len(),
            "Sync finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl<R: ProjectionRow> Resync for Synchronizer<R> {
    fn projection_name(&self) -> &str {
        &self.name
    }

    async fn sync_one(&self, id: Uuid) -> RebuildOutcome {
        self.reconciler.rebuild(id).await
    }

    async fn sync_differences_only(&self) -> ProjectionResult<SyncReport> {
        self.scan(false).await
    }

    async fn sync_all(&self) -> ProjectionResult<SyncReport> {
        self.scan(true).await
    }
}
