// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests for command execution and event publication
//!
//! These tests verify the complete write-side flow:
//! 1. Execute command → validate → event
//! 2. Event applied, state saved, version advanced
//! 3. Event (or error event) published on the per-key stream
//! 4. State reconstructable by folding the published events

mod fixtures;

use fixtures::*;
use pretty_assertions::assert_eq;

use vending_sync::aggregate::{Aggregate, Machine};
use vending_sync::domain::{Denomination, Money, Slot};
use vending_sync::events::{ErrorCode, EventEnvelope, MachineEvent, StreamMessage, VendingEvent};
use vending_sync::{ServiceError, VendingSystem};

/// Built but not started: streams fill up, nothing consumes them
async fn system() -> VendingSystem {
    VendingSystem::build(test_config())
        .await
        .expect("system builds without NATS")
}

fn events(messages: Vec<StreamMessage<MachineEvent>>) -> Vec<EventEnvelope<MachineEvent>> {
    messages
        .into_iter()
        .filter_map(|message| match message {
            StreamMessage::Event(envelope) => Some(envelope),
            StreamMessage::Error(_) => None,
        })
        .collect()
}

/// Test: stock a machine, take money, sell a snack
#[tokio::test]
async fn test_complete_buy_flow() {
    // Arrange
    let system = system().await;
    let service = system.service();
    let (machine_id, snack_id) = (machine_id(), snack_id());
    service
        .initialize_snack(snack_id, "Chips", None, &ctx())
        .await
        .unwrap();
    service
        .initialize_machine(
            machine_id,
            vec![Slot::empty(1), Slot::empty(2)],
            Money::of(Denomination::One, 10),
            &ctx(),
        )
        .await
        .unwrap();
    service
        .load_snacks(machine_id, 1, pile(snack_id, 5, 3), &ctx())
        .await
        .unwrap();
    service
        .insert_money(machine_id, Money::of(Denomination::Five, 1), &ctx())
        .await
        .unwrap();

    // Act
    let receipt = service.buy_snack(machine_id, 1, &ctx()).await.unwrap();

    // Assert
    assert_eq!(receipt.machine.version, 4);
    assert_eq!(receipt.machine.amount_in_transaction, 2);
    assert_eq!(receipt.machine.slot(1).unwrap().snack_pile.unwrap().quantity, 4);
    assert_eq!(receipt.purchase.version, 1);
    assert_eq!(receipt.purchase.machine_id, machine_id);
    assert_eq!(receipt.purchase.snack_id, snack_id);
    assert_eq!(receipt.purchase.bought_price, 3);
    assert_eq!(receipt.purchase.bought_by.as_deref(), Some(OPERATOR));

    let purchase_events = system
        .channels()
        .purchases
        .read_key(receipt.purchase_id)
        .await;
    match purchase_events.as_slice() {
        [StreamMessage::Event(envelope)] => assert_eq!(envelope.trace_id, ctx().trace_id),
        other => panic!("expected one purchase event, got {:?}", other),
    }
}

/// Test: a rejected buy records nothing and publishes an error event
#[tokio::test]
async fn test_rejected_buy_creates_no_purchase() {
    let system = system().await;
    let service = system.service();
    service
        .initialize_machine(machine_id(), vec![Slot::empty(1)], Money::ZERO, &ctx())
        .await
        .unwrap();

    let result = service.buy_snack(machine_id(), 1, &ctx()).await;

    let err = result.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MachineBuySnack.code()));
    assert!(system.channels().purchases.is_empty().await);

    let messages = system.channels().machines.read_key(machine_id()).await;
    assert_eq!(messages.len(), 2);
    match &messages[1] {
        StreamMessage::Error(error) => {
            assert_eq!(error.code, 211);
            assert_eq!(error.version, 1);
            assert!(error.reasons.iter().any(|r| r.contains("no stock")));
        }
        other => panic!("expected error event, got {:?}", other),
    }
    assert_eq!(service.get_machine(machine_id()).await.unwrap().version, 1);
}

/// Test: every failed rule is reported at once
#[tokio::test]
async fn test_remove_reports_transaction_in_progress() {
    let system = system().await;
    let service = system.service();
    service
        .initialize_machine(machine_id(), vec![], Money::ZERO, &ctx())
        .await
        .unwrap();
    service
        .insert_money(machine_id(), Money::of(Denomination::Five, 1), &ctx())
        .await
        .unwrap();

    let err = service.remove_machine(machine_id(), &ctx()).await.unwrap_err();

    match err {
        ServiceError::Rejected { code, reasons } => {
            assert_eq!(code, 202);
            assert_eq!(reasons, vec!["Machine is still in transaction (5 inserted)".to_string()]);
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

/// Test: the published stream folds back into the stored state
#[tokio::test]
async fn test_state_reconstructs_from_stream() {
    let system = system().await;
    let service = system.service();
    service
        .initialize_machine(machine_id(), vec![Slot::empty(1)], Money::ZERO, &ctx())
        .await
        .unwrap();
    service.add_slot(machine_id(), 2, &ctx()).await.unwrap();
    service
        .load_money(machine_id(), Money::of(Denomination::Ten, 3), &ctx())
        .await
        .unwrap();
    service.remove_slot(machine_id(), 1, &ctx()).await.unwrap();

    let stored = service.get_machine(machine_id()).await.unwrap();
    let envelopes = events(system.channels().machines.read_key(machine_id()).await);
    let folded = Machine::from_events(machine_id(), &envelopes);

    assert_eq!(folded, stored);
    assert_eq!(
        envelopes.iter().map(|e| e.version).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
}

/// Test: machine events are broadcast, snack events are not
#[tokio::test]
async fn test_broadcast_membership() {
    let system = system().await;
    let service = system.service();
    service
        .initialize_snack(snack_id(), "Chips", None, &ctx())
        .await
        .unwrap();
    service
        .initialize_machine(machine_id(), vec![], Money::ZERO, &ctx())
        .await
        .unwrap();

    let broadcast = &system.channels().broadcast;

    assert_eq!(broadcast.len().await, 1);
    assert!(broadcast.read_key(snack_id()).await.is_empty());
    let all = broadcast.read_key(machine_id()).await;
    assert!(matches!(&all[0], VendingEvent::Machine(e) if e.aggregate_id == machine_id()));
}
