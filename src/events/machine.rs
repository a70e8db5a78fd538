// Copyright (c) 2025 - Cowboy AI, Inc.
//! Machine Domain Events
//!
//! Events are past tense and immutable. Money events carry both the delta
//! (what moved) and the resulting totals, so a projection can apply them
//! without re-deriving state; slot events carry the full resulting slot.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::DomainEvent;
use crate::domain::{Money, Slot};

/// Machine Domain Events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MachineEvent {
    /// Machine was initialized (full snapshot)
    Initialized {
        slots: Vec<Slot>,
        money_inside: Money,
    },

    /// Machine was removed; lists the snacks it still held
    Removed {
        snack_ids: Vec<Uuid>,
    },

    SlotAdded {
        slot: Slot,
    },

    SlotRemoved {
        position: u32,
    },

    /// Operator loaded money into the cash box
    MoneyLoaded {
        money: Money,
        money_inside: Money,
    },

    /// Operator emptied the cash box
    MoneyUnloaded {
        money: Money,
        money_inside: Money,
    },

    /// Customer inserted money
    MoneyInserted {
        money: Money,
        money_inside: Money,
        amount_in_transaction: u64,
    },

    /// Change was handed back to the customer
    MoneyReturned {
        money: Money,
        money_inside: Money,
        amount_in_transaction: u64,
    },

    SnacksLoaded {
        slot: Slot,
    },

    /// Slot emptied; carries the snack that was taken out
    SnacksUnloaded {
        slot: Slot,
        snack_id: Uuid,
    },

    /// One unit was sold from a slot
    SnackBought {
        purchase_id: Uuid,
        snack_id: Uuid,
        bought_price: u64,
        slot: Slot,
        amount_in_transaction: u64,
    },
}

impl MachineEvent {
    /// Snacks whose cross-machine statistics this event changes
    pub fn affected_snacks(&self) -> Vec<Uuid> {
        use MachineEvent::*;

        match self {
            Initialized { slots, .. } => slots
                .iter()
                .filter_map(|slot| slot.snack_pile.map(|pile| pile.snack_id))
                .collect(),
            SnacksLoaded { slot } => slot.snack_pile.map(|pile| pile.snack_id).into_iter().collect(),
            SnacksUnloaded { snack_id, .. } | SnackBought { snack_id, .. } => vec![*snack_id],
            Removed { snack_ids } => snack_ids.clone(),
            SlotAdded { .. }
            | SlotRemoved { .. }
            | MoneyLoaded { .. }
            | MoneyUnloaded { .. }
            | MoneyInserted { .. }
            | MoneyReturned { .. } => Vec::new(),
        }
    }
}

impl DomainEvent for MachineEvent {
    fn event_type_name(&self) -> &'static str {
        use MachineEvent::*;

        match self {
            Initialized { .. } => "MachineInitialized",
            Removed { .. } => "MachineRemoved",
            SlotAdded { .. } => "MachineSlotAdded",
            SlotRemoved { .. } => "MachineSlotRemoved",
            MoneyLoaded { .. } => "MachineMoneyLoaded",
            MoneyUnloaded { .. } => "MachineMoneyUnloaded",
            MoneyInserted { .. } => "MachineMoneyInserted",
            MoneyReturned { .. } => "MachineMoneyReturned",
            SnacksLoaded { .. } => "MachineSnacksLoaded",
            SnacksUnloaded { .. } => "MachineSnacksUnloaded",
            SnackBought { .. } => "MachineSnackBought",
        }
    }

    fn is_initializing(&self) -> bool {
        matches!(self, MachineEvent::Initialized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SnackPile;

    #[test]
    fn test_serializes_with_type_tag() {
        let event = MachineEvent::SlotRemoved { position: 3 };

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "slot_removed");
        assert_eq!(json["position"], 3);
        assert_eq!(serde_json::from_value::<MachineEvent>(json).unwrap(), event);
    }

    #[test]
    fn test_affected_snacks() {
        let chips = Uuid::now_v7();
        let loaded = MachineEvent::SnacksLoaded {
            slot: Slot {
                position: 1,
                snack_pile: Some(SnackPile {
                    snack_id: chips,
                    quantity: 2,
                    price: 1,
                }),
            },
        };

        assert_eq!(loaded.affected_snacks(), vec![chips]);
        assert!(MachineEvent::SlotAdded {
            slot: Slot::empty(2)
        }
        .affected_snacks()
        .is_empty());
        assert_eq!(
            MachineEvent::Removed {
                snack_ids: vec![chips]
            }
            .affected_snacks(),
            vec![chips]
        );
    }
}
