// Copyright (c) 2025 - Cowboy AI, Inc.

//! Projections - query-optimized read models
//!
//! Every aggregate kind has one read-model row per aggregate id. Rows are
//! written by exactly two paths, which converge rather than conflict:
//!
//! ```text
//! per-key stream ──→ IncrementalProjector ──(row.version == v − 1)──→ apply delta
//!                           │
//!                           └──(anything else)──→ Reconciler::rebuild
//!                                                      │
//! Synchronizer (timer) ──────────────────────────────────┘
//!                                   authoritative snapshot → conditional upsert
//! ```
//!
//! # Guarantees
//!
//! 1. **Version gated**: a delta applies only onto the version it follows
//! 2. **Idempotent**: a duplicate delivery routes to rebuild, which overwrites
//!    with the same snapshot
//! 3. **Self healing**: mismatches, missing rows and failures all end in rebuild
//! 4. **Never corrupted**: on failure the row stays stale, not half-written
//!
//! # Module Organization
//!
//! - [`rows`] - `MachineInfo`, `SnackInfo`, `PurchaseInfo`
//! - [`store`] - row storage with concurrency tokens
//! - [`projector`] - incremental apply state machine
//! - [`reconciler`] - full rebuild with bounded retry
//! - [`machine`], [`snack`], [`purchase`] - per-kind deltas and snapshots
//! - [`notice`] - "projection saved / removed / failed" notices
//! - [`query`] - filter, sort, page, search
//! - [`runner`] - subscription pumps feeding the above

pub mod machine;
pub mod notice;
pub mod projector;
pub mod purchase;
pub mod query;
pub mod reconciler;
pub mod rows;
pub mod runner;
pub mod snack;
pub mod store;

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::AggregateKind;
use crate::errors::RuntimeError;

pub use machine::{MachineProjection, MachineSnapshots};
pub use notice::{LogNoticeSink, MirroredNoticeSink, NoticeSink, ProjectionNotice};
pub use projector::{ApplyOutcome, IncrementalProjector, RowProjection};
pub use purchase::{PurchaseProjection, PurchaseSnapshots};
pub use query::{Page, Query, SortDirection};
pub use reconciler::{RebuildOutcome, Reconciler, RetryPolicy, SnapshotSource};
pub use rows::{MachineInfo, PurchaseInfo, SnackInfo};
pub use runner::{spawn_broadcast_listener, spawn_cache_listener, spawn_projector, RunnerHandle};
pub use snack::{SnackProjection, SnackSnapshots};
pub use store::{InMemoryProjectionStore, ProjectionStore, StoreError, Stored};

/// Errors raised while building or writing a projection row
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A row write lost against a concurrent writer
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading the authoritative aggregate failed
    #[error("Source unavailable: {0}")]
    Source(#[from] RuntimeError),

    /// A cross-aggregate dependency could not be resolved
    #[error("{kind} {id} required by the projection was not found")]
    MissingDependency { kind: AggregateKind, id: Uuid },

    /// The event cannot be applied to the row it was routed to
    #[error("Cannot apply {event_type} to {kind} row {id}")]
    InvalidEvent {
        kind: AggregateKind,
        id: Uuid,
        event_type: &'static str,
    },
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// A read-model row
pub trait ProjectionRow:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Aggregate kind the row mirrors
    const KIND: AggregateKind;

    fn id(&self) -> Uuid;

    /// Version of the last event reflected in the row
    fn version(&self) -> u64;

    /// Text fields covered by free-text search
    fn search_text(&self) -> Vec<&str>;

    /// "Projection saved" notice carrying the row
    fn saved(self) -> ProjectionNotice;

    /// "Projection removed" notice for a hard-deleted row
    fn removed(id: Uuid) -> ProjectionNotice;
}
