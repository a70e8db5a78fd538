// Copyright (c) 2025 - Cowboy AI, Inc.
//! Projection notices
//!
//! Published after every row write so downstream consumers (caches, UI
//! layers) see corrected state, and on projection failures.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::rows::{MachineInfo, PurchaseInfo, SnackInfo};
use crate::domain::AggregateKind;
use crate::errors::RuntimeResult;
use crate::events::{ErrorCode, ErrorEvent};
use crate::runtime::{InMemoryEventLog, LogEntry};

/// What travels on the projection notice stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ProjectionNotice {
    MachineInfoSaved(MachineInfo),
    MachineInfoRemoved { id: Uuid },
    SnackInfoSaved(SnackInfo),
    SnackInfoRemoved { id: Uuid },
    PurchaseInfoSaved(PurchaseInfo),
    PurchaseInfoRemoved { id: Uuid },

    /// A projection failed; the row was left stale
    Error(ErrorEvent),
}

impl ProjectionNotice {
    /// Id of the row the notice is about
    pub fn row_id(&self) -> Uuid {
        match self {
            ProjectionNotice::MachineInfoSaved(row) => row.id,
            ProjectionNotice::SnackInfoSaved(row) => row.id,
            ProjectionNotice::PurchaseInfoSaved(row) => row.id,
            ProjectionNotice::MachineInfoRemoved { id }
            | ProjectionNotice::SnackInfoRemoved { id }
            | ProjectionNotice::PurchaseInfoRemoved { id } => *id,
            ProjectionNotice::Error(error) => error.aggregate_id,
        }
    }

    /// Kind of row the notice is about; `None` for failures
    pub fn kind(&self) -> Option<AggregateKind> {
        match self {
            ProjectionNotice::MachineInfoSaved(_) | ProjectionNotice::MachineInfoRemoved { .. } => {
                Some(AggregateKind::Machine)
            }
            ProjectionNotice::SnackInfoSaved(_) | ProjectionNotice::SnackInfoRemoved { .. } => {
                Some(AggregateKind::Snack)
            }
            ProjectionNotice::PurchaseInfoSaved(_) | ProjectionNotice::PurchaseInfoRemoved { .. } => {
                Some(AggregateKind::Purchase)
            }
            ProjectionNotice::Error(_) => None,
        }
    }

    /// Error notice for a failed apply or rebuild
    pub fn failure(
        aggregate_id: Uuid,
        version: u64,
        code: ErrorCode,
        reasons: Vec<String>,
    ) -> Self {
        ProjectionNotice::Error(ErrorEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            version,
            trace_id: Uuid::now_v7(),
            operated_at: Utc::now(),
            operated_by: "projection".to_string(),
            code: code.code(),
            reasons,
        })
    }
}

impl LogEntry for ProjectionNotice {
    fn key(&self) -> Uuid {
        self.row_id()
    }

    fn sequence(&self) -> Option<u64> {
        None
    }
}

/// Destination for projection notices
#[async_trait]
pub trait NoticeSink: Send + Sync {
    async fn notify(&self, notice: ProjectionNotice) -> RuntimeResult<()>;
}

/// Sink appending to the in-memory notice stream
#[derive(Clone)]
pub struct LogNoticeSink {
    log: InMemoryEventLog<ProjectionNotice>,
}

impl LogNoticeSink {
    pub fn new(log: InMemoryEventLog<ProjectionNotice>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl NoticeSink for LogNoticeSink {
    async fn notify(&self, notice: ProjectionNotice) -> RuntimeResult<()> {
        self.log.append(notice).await.map(|_| ())
    }
}

/// Primary sink plus best-effort mirrors
pub struct MirroredNoticeSink {
    primary: Arc<dyn NoticeSink>,
    mirrors: Vec<Arc<dyn NoticeSink>>,
}

impl MirroredNoticeSink {
    pub fn new(primary: Arc<dyn NoticeSink>) -> Self {
        Self {
            primary,
            mirrors: Vec::new(),
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn NoticeSink>) -> Self {
        self.mirrors.push(mirror);
        self
    }
}

#[async_trait]
impl NoticeSink for MirroredNoticeSink {
    async fn notify(&self, notice: ProjectionNotice) -> RuntimeResult<()> {
        for mirror in &self.mirrors {
            if let Err(e) = mirror.notify(notice.clone()).await {
                warn!(row_id = %notice.row_id(), error = %e, "Mirror notice failed");
            }
        }
        self.primary.notify(notice).await
    }
}

/// Publish a notice, logging instead of failing
pub(crate) async fn notify_or_log(sink: &dyn NoticeSink, notice: ProjectionNotice) {
    let row_id = notice.row_id();
    if let Err(e) = sink.notify(notice).await {
        warn!(row_id = %row_id, error = %e, "Failed to publish projection notice");
    }
}
