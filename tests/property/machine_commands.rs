// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Machine fold
//!
//! Random command scripts run through `handle` and `apply` with no I/O.
//! Rejected commands are simply dropped, as the host would do.

use proptest::prelude::*;
use std::collections::HashSet;

use vending_sync::aggregate::{Aggregate, Machine, MachineCommand};
use vending_sync::events::{EventEnvelope, MachineEvent};

use super::strategies::machine_script;
use crate::fixtures::{ctx, machine_envelope, machine_id};

/// Every intermediate state and every committed envelope
fn run(script: Vec<MachineCommand>) -> (Vec<Machine>, Vec<EventEnvelope<MachineEvent>>) {
    let ctx = ctx();
    let mut state = Machine::new(machine_id());
    let mut states = vec![state.clone()];
    let mut envelopes = Vec::new();

    for command in script {
        if let Ok(event) = state.handle(command, &ctx) {
            let envelope = machine_envelope(machine_id(), state.version + 1, event);
            state = state.apply(&envelope);
            envelopes.push(envelope);
            states.push(state.clone());
        }
    }

    (states, envelopes)
}

proptest! {
    /// Property: committed versions are 1, 2, 3, ... with no gaps
    #[test]
    fn prop_versions_are_contiguous(script in machine_script(40)) {
        let (states, envelopes) = run(script);

        let versions: Vec<u64> = envelopes.iter().map(|e| e.version).collect();
        let expected: Vec<u64> = (1..=envelopes.len() as u64).collect();
        prop_assert_eq!(versions, expected);
        prop_assert_eq!(states.last().map(|s| s.version), Some(envelopes.len() as u64));
    }

    /// Property: folding the committed stream rebuilds the final state
    #[test]
    fn prop_fold_reconstructs_state(script in machine_script(40)) {
        let (states, envelopes) = run(script);

        let folded = Machine::from_events(machine_id(), &envelopes);

        prop_assert_eq!(Some(&folded), states.last());
    }

    /// Property: the open transaction is always backed by cash in the box
    #[test]
    fn prop_transaction_is_backed_by_cash(script in machine_script(40)) {
        let (states, _) = run(script);

        for state in &states {
            prop_assert!(
                state.amount_in_transaction <= state.money_inside.amount(),
                "{} in transaction but only {} inside",
                state.amount_in_transaction,
                state.money_inside.amount()
            );
        }
    }

    /// Property: slot positions stay unique
    #[test]
    fn prop_slot_positions_are_unique(script in machine_script(40)) {
        let (states, _) = run(script);

        for state in &states {
            let positions: HashSet<u32> = state.slots.iter().map(|s| s.position).collect();
            prop_assert_eq!(positions.len(), state.slots.len());
        }
    }

    /// Property: nothing is accepted after removal
    #[test]
    fn prop_removed_machine_is_frozen(script in machine_script(40)) {
        let (states, _) = run(script);

        let removed_at = states.iter().position(|s| s.is_deleted);
        if let Some(index) = removed_at {
            prop_assert_eq!(index, states.len() - 1, "events committed after removal");
        }
    }
}
