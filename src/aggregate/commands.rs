// Copyright (c) 2025 - Cowboy AI, Inc.
//! Commands for the vending aggregates
//!
//! Commands express user intent and can fail validation.
//! They contain all data needed for business rule enforcement; attribution,
//! trace id and time travel alongside in [`super::CommandContext`].
//!
//! # Command Pattern
//!
//! ```text
//! Command → Aggregate::handle(State, Command, Context) → Result<Event, ValidationReport>
//! ```

use uuid::Uuid;

use crate::domain::{Money, Slot, SnackPile};

/// Commands accepted by a vending machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineCommand {
    /// Create the machine with an initial layout and cash box
    Initialize { slots: Vec<Slot>, money_inside: Money },

    Remove,

    AddSlot { position: u32 },

    RemoveSlot { position: u32 },

    /// Operator adds notes to the cash box
    LoadMoney { money: Money },

    /// Operator empties the cash box
    UnloadMoney,

    /// Customer inserts notes
    InsertMoney { money: Money },

    /// Hand back whatever is left of the current transaction
    ReturnMoney,

    /// Fill a slot, or top it up with the snack it already holds
    LoadSnacks { position: u32, snack_pile: SnackPile },

    UnloadSnacks { position: u32 },

    /// Sell one unit; `purchase_id` names the Purchase that records it
    BuySnack { position: u32, purchase_id: Uuid },
}

/// Commands accepted by a catalog snack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnackCommand {
    Initialize {
        name: String,
        picture_url: Option<String>,
    },
    Remove,
    ChangeName {
        name: String,
    },
    ChangePictureUrl {
        picture_url: Option<String>,
    },
}

/// Commands accepted by a purchase record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseCommand {
    Initialize {
        machine_id: Uuid,
        position: u32,
        snack_id: Uuid,
        bought_price: u64,
    },
}
