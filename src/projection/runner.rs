// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subscription pumps
//!
//! Long-running tasks that feed the projection layer:
//!
//! - [`spawn_projector`] shards a per-key stream across N workers by
//!   aggregate id, so one key's events apply in order while different keys
//!   run in parallel
//! - [`spawn_broadcast_listener`] rebuilds rows whose cross-aggregate
//!   counters a broadcast event changed
//! - [`spawn_cache_listener`] keeps the snack cache in step with saved rows

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::notice::ProjectionNotice;
use super::projector::{IncrementalProjector, RowProjection};
use super::reconciler::Reconciler;
use super::rows::{MachineInfo, SnackInfo};
use crate::cache::{CachedSnack, SnackInfoCache};
use crate::events::{PurchaseEvent, StreamMessage, VendingEvent};
use crate::runtime::{InMemoryEventLog, ResumeToken};

const SHARD_QUEUE_DEPTH: usize = 256;

/// Handle to a group of pump tasks
pub struct RunnerHandle {
    name: String,
    checkpoint: Arc<AtomicU64>,
    tasks: Vec<JoinHandle<()>>,
}

impl RunnerHandle {
    fn new(name: impl Into<String>, from: ResumeToken) -> Self {
        Self {
            name: name.into(),
            checkpoint: Arc::new(AtomicU64::new(from.0)),
            tasks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token that resumes after the last dispatched record
    pub fn checkpoint(&self) -> ResumeToken {
        ResumeToken(self.checkpoint.load(Ordering::SeqCst))
    }

    /// True once every task has ended
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }

    /// Abort every task and wait for it to end
    pub async fn stop(self) -> ResumeToken {
        self.abort();
        for task in self.tasks {
            let _ = task.await;
        }
        info!(runner = %self.name, "Runner stopped");
        ResumeToken(self.checkpoint.load(Ordering::SeqCst))
    }
}

fn shard_of(key: Uuid, shards: usize) -> usize {
    (key.as_u128() % shards as u128) as usize
}

/// Pump a per-key stream into an incremental projector
pub fn spawn_projector<P: RowProjection>(
    name: impl Into<String>,
    projector: Arc<IncrementalProjector<P>>,
    log: &InMemoryEventLog<StreamMessage<P::Event>>,
    from: ResumeToken,
    shards: usize,
) -> RunnerHandle {
    let shards = shards.max(1);
    let mut handle = RunnerHandle::new(name, from);
    let mut senders = Vec::with_capacity(shards);

    for shard in 0..shards {
        let (tx, mut rx) = mpsc::channel::<StreamMessage<P::Event>>(SHARD_QUEUE_DEPTH);
        senders.push(tx);

        let projector = Arc::clone(&projector);
        let runner = handle.name.clone();
        handle.tasks.push(tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let outcome = projector.handle(&message).await;
                debug!(
                    runner = %runner,
                    shard,
                    aggregate_id = %message.aggregate_id(),
                    ?outcome,
                    "Message projected"
                );
            }
        }));
    }

    let mut subscription = log.subscribe(from);
    let checkpoint = Arc::clone(&handle.checkpoint);
    let runner = handle.name.clone();
    handle.tasks.push(tokio::spawn(async move {
        info!(runner = %runner, shards, from = from.0, "Projector started");
        while let Some((record, token)) = subscription.next().await {
            let shard = shard_of(record.message.aggregate_id(), shards);
            if senders[shard].send(record.message).await.is_err() {
                warn!(runner = %runner, shard, "Shard worker gone; stopping dispatch");
                break;
            }
            checkpoint.store(token.0, Ordering::SeqCst);
        }
        info!(runner = %runner, "Projector source ended");
    }));

    handle
}

/// Rebuild cross-aggregate counters named by broadcast events
///
/// Machine events refresh the snacks they stocked, unloaded or sold.
/// Purchase events refresh the machine and the snack they recorded.
pub fn spawn_broadcast_listener(
    log: &InMemoryEventLog<VendingEvent>,
    from: ResumeToken,
    machines: Arc<Reconciler<MachineInfo>>,
    snacks: Arc<Reconciler<SnackInfo>>,
) -> RunnerHandle {
    let mut handle = RunnerHandle::new("broadcast", from);
    let mut subscription = log.subscribe(from);
    let checkpoint = Arc::clone(&handle.checkpoint);

    handle.tasks.push(tokio::spawn(async move {
        while let Some((record, token)) = subscription.next().await {
            match &record.message {
                VendingEvent::Machine(envelope) => {
                    for snack_id in envelope.event.affected_snacks() {
                        let outcome = snacks.rebuild(snack_id).await;
                        debug!(
                            machine_id = %envelope.aggregate_id,
                            snack_id = %snack_id,
                            ?outcome,
                            "Snack stats refreshed"
                        );
                    }
                }
                VendingEvent::Purchase(envelope) => {
                    let PurchaseEvent::Initialized {
                        machine_id,
                        snack_id,
                        ..
                    } = &envelope.event;
                    let machine = machines.rebuild(*machine_id).await;
                    let snack = snacks.rebuild(*snack_id).await;
                    debug!(
                        purchase_id = %envelope.aggregate_id,
                        ?machine,
                        ?snack,
                        "Sales stats refreshed"
                    );
                }
            }
            checkpoint.store(token.0, Ordering::SeqCst);
        }
    }));

    handle
}

/// Overwrite cached snack fields whenever a snack row is saved
pub fn spawn_cache_listener(
    log: &InMemoryEventLog<ProjectionNotice>,
    from: ResumeToken,
    cache: Arc<SnackInfoCache>,
) -> RunnerHandle {
    let mut handle = RunnerHandle::new("snack-cache", from);
    let mut subscription = log.subscribe(from);
    let checkpoint = Arc::clone(&handle.checkpoint);

    handle.tasks.push(tokio::spawn(async move {
        while let Some((record, token)) = subscription.next().await {
            if let ProjectionNotice::SnackInfoSaved(row) = record.message {
                cache
                    .put(
                        row.id,
                        CachedSnack {
                            name: row.name,
                            picture_url: row.picture_url,
                        },
                    )
                    .await;
            }
            checkpoint.store(token.0, Ordering::SeqCst);
        }
    }));

    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_is_stable_and_in_range() {
        let key = Uuid::now_v7();
        let shard = shard_of(key, 4);
        assert!(shard < 4);
        assert_eq!(shard, shard_of(key, 4));
        assert_eq!(shard_of(key, 1), 0);
    }
}
