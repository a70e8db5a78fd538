// Copyright (c) 2025 - Cowboy AI, Inc.
//! Strategies shared by the property tests

use proptest::prelude::*;
use uuid::Uuid;

use vending_sync::aggregate::MachineCommand;
use vending_sync::domain::{Denomination, Money, Slot, SnackPile};

use crate::fixtures::{other_snack_id, snack_id};

/// Small amounts of small notes, sometimes nothing at all
pub fn money() -> impl Strategy<Value = Money> {
    (0u32..3, 0u32..3, 0u32..2).prop_map(|(one, two, five)| {
        Money::ZERO
            .with(Denomination::One, one)
            .with(Denomination::Two, two)
            .with(Denomination::Five, five)
    })
}

fn position() -> impl Strategy<Value = u32> {
    1u32..5
}

fn snack_pile() -> impl Strategy<Value = SnackPile> {
    (any::<bool>(), 0u32..6, 1u64..4).prop_map(|(other, quantity, price)| SnackPile {
        snack_id: if other { other_snack_id() } else { snack_id() },
        quantity,
        price,
    })
}

/// Any machine command but `Initialize`; many of them will be rejected
pub fn machine_command() -> impl Strategy<Value = MachineCommand> {
    prop_oneof![
        3 => position().prop_map(|position| MachineCommand::AddSlot { position }),
        1 => position().prop_map(|position| MachineCommand::RemoveSlot { position }),
        2 => money().prop_map(|money| MachineCommand::LoadMoney { money }),
        1 => Just(MachineCommand::UnloadMoney),
        4 => money().prop_map(|money| MachineCommand::InsertMoney { money }),
        2 => Just(MachineCommand::ReturnMoney),
        4 => (position(), snack_pile()).prop_map(|(position, snack_pile)| {
            MachineCommand::LoadSnacks {
                position,
                snack_pile,
            }
        }),
        1 => position().prop_map(|position| MachineCommand::UnloadSnacks { position }),
        4 => position().prop_map(|position| MachineCommand::BuySnack {
            position,
            purchase_id: Uuid::nil(),
        }),
        1 => Just(MachineCommand::Remove),
    ]
}

/// Initialize followed by up to `max` random commands
pub fn machine_script(max: usize) -> impl Strategy<Value = Vec<MachineCommand>> {
    prop::collection::vec(machine_command(), 0..max).prop_map(|commands| {
        let mut script = vec![MachineCommand::Initialize {
            slots: vec![Slot::empty(1)],
            money_inside: Money::of(Denomination::One, 5),
        }];
        script.extend(commands);
        script
    })
}
