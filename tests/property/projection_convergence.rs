// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for projection convergence
//!
//! Whatever order the per-key stream is delivered in, and however often a
//! message is redelivered, the row ends up equal to the authoritative
//! snapshot.

use proptest::prelude::*;
use std::sync::Arc;

use vending_sync::aggregate::{Machine, MachineCommand, Purchase};
use vending_sync::events::{MachineEvent, StreamMessage, VendingEvent};
use vending_sync::projection::{
    IncrementalProjector, InMemoryProjectionStore, LogNoticeSink, MachineInfo, MachineProjection,
    MachineSnapshots, ProjectionStore, Reconciler, RetryPolicy, SnapshotSource,
};
use vending_sync::publisher::LogPublisher;
use vending_sync::runtime::{AggregateHost, InMemoryEventLog, InMemoryStateStore};
use vending_sync::stats::HostStats;

use super::strategies::machine_script;
use crate::fixtures::{ctx, machine_id};

struct Outcome {
    row: Option<MachineInfo>,
    snapshot: Option<MachineInfo>,
}

/// Run the script, then deliver its stream in the given order
async fn deliver(script: Vec<MachineCommand>, order: Vec<u64>, duplicates: Vec<bool>) -> Outcome {
    let stream = InMemoryEventLog::<StreamMessage<MachineEvent>>::new("machine");
    let machines = Arc::new(AggregateHost::new(
        Arc::new(InMemoryStateStore::<Machine>::new()),
        Arc::new(LogPublisher::<Machine>::new(
            stream.clone(),
            InMemoryEventLog::<VendingEvent>::new("broadcast"),
        )),
    ));
    let purchases = Arc::new(AggregateHost::new(
        Arc::new(InMemoryStateStore::<Purchase>::new()),
        Arc::new(LogPublisher::<Purchase>::new(
            InMemoryEventLog::new("purchase"),
            InMemoryEventLog::new("broadcast"),
        )),
    ));

    for command in script {
        let _ = machines.execute(machine_id(), command, &ctx()).await;
    }

    let store = Arc::new(InMemoryProjectionStore::<MachineInfo>::new());
    let notices = Arc::new(LogNoticeSink::new(InMemoryEventLog::new("projection")));
    let snapshots = Arc::new(MachineSnapshots::new(
        machines.clone(),
        Arc::new(HostStats::new(machines.clone(), purchases)),
    ));
    let reconciler = Arc::new(Reconciler::<MachineInfo>::new(
        snapshots.clone(),
        store.clone(),
        notices.clone(),
        RetryPolicy::default(),
    ));
    let projector = IncrementalProjector::new(MachineProjection, store.clone(), reconciler, notices);

    let mut messages: Vec<(u64, usize, StreamMessage<MachineEvent>)> = stream
        .read_key(machine_id())
        .await
        .into_iter()
        .enumerate()
        .map(|(i, message)| (order[i % order.len()], i, message))
        .collect();
    messages.sort_by_key(|(rank, i, _)| (*rank, *i));

    for (i, (_, _, message)) in messages.iter().enumerate() {
        projector.handle(message).await;
        if duplicates[i % duplicates.len()] {
            projector.handle(message).await;
        }
    }

    Outcome {
        row: store
            .get(machine_id())
            .await
            .ok()
            .flatten()
            .map(|stored| stored.row),
        snapshot: snapshots.snapshot(machine_id()).await.ok().flatten(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: in-order delivery keeps the row equal to the snapshot
    #[test]
    fn prop_in_order_delivery_matches_snapshot(script in machine_script(25)) {
        let outcome = tokio_test::block_on(deliver(script, vec![0], vec![false]));

        prop_assert!(outcome.snapshot.is_some());
        prop_assert_eq!(outcome.row, outcome.snapshot);
    }

    /// Property: any delivery order converges to the snapshot
    #[test]
    fn prop_shuffled_delivery_converges(
        script in machine_script(25),
        order in prop::collection::vec(any::<u64>(), 1..30),
    ) {
        let outcome = tokio_test::block_on(deliver(script, order, vec![false]));

        prop_assert_eq!(outcome.row, outcome.snapshot);
    }

    /// Property: redelivery never changes the converged row
    #[test]
    fn prop_redelivery_is_idempotent(
        script in machine_script(25),
        duplicates in prop::collection::vec(any::<bool>(), 1..30),
    ) {
        let outcome = tokio_test::block_on(deliver(script, vec![0], duplicates));

        prop_assert_eq!(outcome.row, outcome.snapshot);
    }
}
