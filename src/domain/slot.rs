// Copyright (c) 2025 - Cowboy AI, Inc.
//! Machine slot value objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock of a single snack held in one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnackPile {
    /// Snack aggregate this stock belongs to
    pub snack_id: Uuid,

    /// Units left in the slot
    pub quantity: u32,

    /// Unit price in whole currency units
    pub price: u64,
}

impl SnackPile {
    /// Total value of the pile (quantity × price)
    pub fn amount(&self) -> u64 {
        u64::from(self.quantity) * self.price
    }

    /// Same pile with one unit taken out; `None` when empty
    pub fn take_one(&self) -> Option<SnackPile> {
        let quantity = self.quantity.checked_sub(1)?;
        Some(SnackPile { quantity, ..*self })
    }
}

/// A numbered slot in a machine, optionally holding a pile of snacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub position: u32,
    pub snack_pile: Option<SnackPile>,
}

impl Slot {
    /// Empty slot at a position
    pub fn empty(position: u32) -> Self {
        Self {
            position,
            snack_pile: None,
        }
    }

    /// True when the slot holds no units
    pub fn is_empty(&self) -> bool {
        self.snack_pile.map_or(true, |pile| pile.quantity == 0)
    }
}

/// Find a slot by position
pub fn find_slot(slots: &[Slot], position: u32) -> Option<&Slot> {
    slots.iter().find(|slot| slot.position == position)
}

/// Replace the slot with the same position, keeping order
pub fn replace_slot(slots: &[Slot], updated: Slot) -> Vec<Slot> {
    slots
        .iter()
        .map(|slot| {
            if slot.position == updated.position {
                updated
            } else {
                *slot
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_one() {
        let pile = SnackPile {
            snack_id: Uuid::nil(),
            quantity: 1,
            price: 3,
        };
        let taken = pile.take_one().unwrap();
        assert_eq!(taken.quantity, 0);
        assert_eq!(taken.take_one(), None);
    }

    #[test]
    fn test_slot_emptiness() {
        assert!(Slot::empty(1).is_empty());
        let stocked = Slot {
            position: 1,
            snack_pile: Some(SnackPile {
                snack_id: Uuid::nil(),
                quantity: 2,
                price: 5,
            }),
        };
        assert!(!stocked.is_empty());
        assert_eq!(stocked.snack_pile.unwrap().amount(), 10);
    }

    #[test]
    fn test_replace_slot_keeps_order() {
        let slots = vec![Slot::empty(1), Slot::empty(2), Slot::empty(3)];
        let updated = Slot {
            position: 2,
            snack_pile: Some(SnackPile {
                snack_id: Uuid::nil(),
                quantity: 4,
                price: 1,
            }),
        };
        let replaced = replace_slot(&slots, updated);
        assert_eq!(replaced.len(), 3);
        assert_eq!(replaced[1], updated);
        assert_eq!(find_slot(&replaced, 3), Some(&Slot::empty(3)));
    }
}
