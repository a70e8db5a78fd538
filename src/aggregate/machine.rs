// Copyright (c) 2025 - Cowboy AI, Inc.
//! Machine Aggregate
//!
//! A vending machine: numbered slots holding snack piles, a cash box
//! ([`Money`]) and the amount the current customer has inserted.
//!
//! # Architecture
//!
//! ```text
//! MachineCommand → validate() → ValidationReport
//!                      ↓ (valid)
//!                  handle() → MachineEvent
//!                                 ↓
//! EventEnvelope<MachineEvent> → apply() → next Machine
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::MachineCommand;
use super::{Aggregate, CommandContext};
use crate::domain::invariants::*;
use crate::domain::slot::{find_slot, replace_slot};
use crate::domain::{AggregateKind, Money, Slot, SnackPile, ValidationFailure, ValidationReport};
use crate::events::{ErrorCode, EventEnvelope, MachineEvent, VendingEvent};

/// Machine State
///
/// Reconstructed by folding [`MachineEvent`]s; see [`Aggregate::from_events`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: Uuid,
    pub version: u64,
    pub is_created: bool,
    pub is_deleted: bool,

    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,

    /// Slots ordered as initialized / added
    pub slots: Vec<Slot>,

    /// Notes in the cash box, customer money included
    pub money_inside: Money,

    /// Inserted by the current customer and not yet spent or returned
    pub amount_in_transaction: u64,
}

impl Machine {
    /// Snacks currently held in any slot
    pub fn snack_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .slots
            .iter()
            .filter_map(|slot| slot.snack_pile.map(|pile| pile.snack_id))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn slot(&self, position: u32) -> Option<&Slot> {
        find_slot(&self.slots, position)
    }

    /// Pile the slot would hold after loading `pile` into it
    fn loaded_pile(&self, position: u32, pile: SnackPile) -> Option<SnackPile> {
        match self.slot(position).and_then(|slot| slot.snack_pile) {
            Some(current) if current.snack_id == pile.snack_id => Some(SnackPile {
                quantity: current.quantity.checked_add(pile.quantity)?,
                ..pile
            }),
            _ => Some(pile),
        }
    }

    /// Cash box and transaction amount after `money` goes in
    fn with_money(&self, money: &Money) -> Option<(Money, u64)> {
        let money_inside = self.money_inside.checked_add(money)?;
        let amount_in_transaction = self.amount_in_transaction.checked_add(money.amount())?;
        Some((money_inside, amount_in_transaction))
    }
}

fn reject(failure: ValidationFailure) -> ValidationReport {
    let mut report = ValidationReport::new();
    report.check(Err(failure));
    report
}

impl Aggregate for Machine {
    const KIND: AggregateKind = AggregateKind::Machine;

    type Command = MachineCommand;
    type Event = MachineEvent;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            is_created: false,
            is_deleted: false,
            created_at: None,
            created_by: None,
            last_modified_at: None,
            last_modified_by: None,
            deleted_at: None,
            deleted_by: None,
            slots: Vec::new(),
            money_inside: Money::ZERO,
            amount_in_transaction: 0,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn is_created(&self) -> bool {
        self.is_created
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn error_code(command: &MachineCommand) -> ErrorCode {
        use MachineCommand::*;

        match command {
            Initialize { .. } => ErrorCode::MachineInitialize,
            Remove => ErrorCode::MachineRemove,
            AddSlot { .. } => ErrorCode::MachineAddSlot,
            RemoveSlot { .. } => ErrorCode::MachineRemoveSlot,
            LoadMoney { .. } => ErrorCode::MachineLoadMoney,
            UnloadMoney => ErrorCode::MachineUnloadMoney,
            InsertMoney { .. } => ErrorCode::MachineInsertMoney,
            ReturnMoney => ErrorCode::MachineReturnMoney,
            LoadSnacks { .. } => ErrorCode::MachineLoadSnacks,
            UnloadSnacks { .. } => ErrorCode::MachineUnloadSnacks,
            BuySnack { .. } => ErrorCode::MachineBuySnack,
        }
    }

    fn validate(&self, command: &MachineCommand, ctx: &CommandContext) -> ValidationReport {
        use MachineCommand::*;

        let mut report = ValidationReport::new();
        report.check(validate_operator(&ctx.operated_by));

        if let Initialize { slots, .. } = command {
            report
                .check(validate_not_created(Self::KIND, self.id, self.is_created))
                .check(validate_unique_positions(slots));
            for pile in slots.iter().filter_map(|slot| slot.snack_pile) {
                validate_pile(&mut report, &pile);
            }
            return report;
        }

        validate_live(&mut report, Self::KIND, self.id, self.is_created, self.is_deleted);

        match command {
            Initialize { .. } => {}
            Remove => {
                report.check(validate_not_in_transaction(self.amount_in_transaction));
            }
            AddSlot { position } => {
                report.check(validate_slot_free(&self.slots, *position));
            }
            RemoveSlot { position } => {
                report
                    .check(validate_slot_exists(&self.slots, *position))
                    .check(validate_slot_empty(&self.slots, *position));
            }
            LoadMoney { money } => {
                report
                    .check(validate_not_in_transaction(self.amount_in_transaction))
                    .check(validate_money_not_empty(money))
                    .check(validate_money_fits(&self.money_inside, 0, money));
            }
            UnloadMoney => {
                report
                    .check(validate_not_in_transaction(self.amount_in_transaction))
                    .check(validate_money_not_empty(&self.money_inside));
            }
            InsertMoney { money } => {
                report
                    .check(validate_money_not_empty(money))
                    .check(validate_money_fits(
                        &self.money_inside,
                        self.amount_in_transaction,
                        money,
                    ));
            }
            ReturnMoney => {
                report
                    .check(validate_in_transaction(self.amount_in_transaction))
                    .check(validate_allocatable(
                        &self.money_inside,
                        self.amount_in_transaction,
                    ));
            }
            LoadSnacks {
                position,
                snack_pile,
            } => {
                report
                    .check(validate_not_in_transaction(self.amount_in_transaction))
                    .check(validate_slot_exists(&self.slots, *position))
                    .check(validate_same_snack(&self.slots, *position, snack_pile))
                    .check(validate_quantity_fits(&self.slots, *position, snack_pile));
                validate_pile(&mut report, snack_pile);
            }
            UnloadSnacks { position } => {
                report
                    .check(validate_not_in_transaction(self.amount_in_transaction))
                    .check(validate_slot_exists(&self.slots, *position))
                    .check(validate_slot_has_stock(&self.slots, *position));
            }
            BuySnack { position, .. } => {
                report
                    .check(validate_slot_exists(&self.slots, *position))
                    .check(validate_slot_has_stock(&self.slots, *position));
                if let Some(pile) = self.slot(*position).and_then(|slot| slot.snack_pile) {
                    report.check(validate_sufficient_funds(
                        pile.price,
                        self.amount_in_transaction,
                    ));
                    if let Some(change) = self.amount_in_transaction.checked_sub(pile.price) {
                        report.check(validate_allocatable(&self.money_inside, change));
                    }
                }
            }
        }

        report
    }

    fn handle(
        &self,
        command: MachineCommand,
        ctx: &CommandContext,
    ) -> Result<MachineEvent, ValidationReport> {
        use MachineCommand::*;

        self.validate(&command, ctx).into_result()?;

        let event = match command {
            Initialize {
                slots,
                money_inside,
            } => MachineEvent::Initialized {
                slots,
                money_inside,
            },
            Remove => MachineEvent::Removed {
                snack_ids: self.snack_ids(),
            },
            AddSlot { position } => MachineEvent::SlotAdded {
                slot: Slot::empty(position),
            },
            RemoveSlot { position } => MachineEvent::SlotRemoved { position },
            LoadMoney { money } => MachineEvent::MoneyLoaded {
                money,
                money_inside: self
                    .money_inside
                    .checked_add(&money)
                    .ok_or_else(|| reject(ValidationFailure::MoneyOverflow))?,
            },
            UnloadMoney => MachineEvent::MoneyUnloaded {
                money: self.money_inside,
                money_inside: Money::ZERO,
            },
            InsertMoney { money } => {
                let (money_inside, amount_in_transaction) = self
                    .with_money(&money)
                    .ok_or_else(|| reject(ValidationFailure::MoneyOverflow))?;
                MachineEvent::MoneyInserted {
                    money,
                    money_inside,
                    amount_in_transaction,
                }
            }
            ReturnMoney => {
                let amount = self.amount_in_transaction;
                let change = self
                    .money_inside
                    .allocate(amount)
                    .ok_or_else(|| reject(ValidationFailure::CannotAllocate { amount }))?;
                let money_inside = self
                    .money_inside
                    .checked_sub(&change)
                    .ok_or_else(|| reject(ValidationFailure::CannotAllocate { amount }))?;
                MachineEvent::MoneyReturned {
                    money: change,
                    money_inside,
                    amount_in_transaction: 0,
                }
            }
            LoadSnacks {
                position,
                snack_pile,
            } => {
                let pile = self
                    .loaded_pile(position, snack_pile)
                    .ok_or_else(|| reject(ValidationFailure::QuantityOverflow { position }))?;
                MachineEvent::SnacksLoaded {
                    slot: Slot {
                        position,
                        snack_pile: Some(pile),
                    },
                }
            }
            UnloadSnacks { position } => {
                let pile = self
                    .slot(position)
                    .and_then(|slot| slot.snack_pile)
                    .ok_or_else(|| reject(ValidationFailure::SlotHasNoStock { position }))?;
                MachineEvent::SnacksUnloaded {
                    slot: Slot::empty(position),
                    snack_id: pile.snack_id,
                }
            }
            BuySnack {
                position,
                purchase_id,
            } => {
                let pile = self
                    .slot(position)
                    .and_then(|slot| slot.snack_pile)
                    .ok_or_else(|| reject(ValidationFailure::SlotHasNoStock { position }))?;
                let remaining = pile
                    .take_one()
                    .ok_or_else(|| reject(ValidationFailure::SlotHasNoStock { position }))?;
                MachineEvent::SnackBought {
                    purchase_id,
                    snack_id: pile.snack_id,
                    bought_price: pile.price,
                    slot: Slot {
                        position,
                        snack_pile: Some(remaining),
                    },
                    amount_in_transaction: self.amount_in_transaction - pile.price,
                }
            }
        };

        Ok(event)
    }

    fn apply(self, envelope: &EventEnvelope<MachineEvent>) -> Self {
        let mut next = Machine {
            version: envelope.version,
            last_modified_at: Some(envelope.operated_at),
            last_modified_by: Some(envelope.operated_by.clone()),
            ..self
        };

        match &envelope.event {
            MachineEvent::Initialized {
                slots,
                money_inside,
            } => {
                next.is_created = true;
                next.created_at = Some(envelope.operated_at);
                next.created_by = Some(envelope.operated_by.clone());
                next.slots = slots.clone();
                next.money_inside = *money_inside;
            }
            MachineEvent::Removed { .. } => {
                next.is_deleted = true;
                next.deleted_at = Some(envelope.operated_at);
                next.deleted_by = Some(envelope.operated_by.clone());
            }
            MachineEvent::SlotAdded { slot } => {
                next.slots.push(*slot);
            }
            MachineEvent::SlotRemoved { position } => {
                next.slots.retain(|slot| slot.position != *position);
            }
            MachineEvent::MoneyLoaded { money_inside, .. }
            | MachineEvent::MoneyUnloaded { money_inside, .. } => {
                next.money_inside = *money_inside;
            }
            MachineEvent::MoneyInserted {
                money_inside,
                amount_in_transaction,
                ..
            }
            | MachineEvent::MoneyReturned {
                money_inside,
                amount_in_transaction,
                ..
            } => {
                next.money_inside = *money_inside;
                next.amount_in_transaction = *amount_in_transaction;
            }
            MachineEvent::SnacksLoaded { slot } | MachineEvent::SnacksUnloaded { slot, .. } => {
                next.slots = replace_slot(&next.slots, *slot);
            }
            MachineEvent::SnackBought {
                slot,
                amount_in_transaction,
                ..
            } => {
                next.slots = replace_slot(&next.slots, *slot);
                next.amount_in_transaction = *amount_in_transaction;
            }
        }

        next
    }

    fn broadcast(envelope: &EventEnvelope<MachineEvent>) -> Option<VendingEvent> {
        Some(VendingEvent::Machine(envelope.clone()))
    }
}
