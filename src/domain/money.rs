// Copyright (c) 2025 - Cowboy AI, Inc.
//! Money Value Object
//!
//! Money inside a vending machine is tracked as a count per denomination,
//! not as a bare amount, because the machine can only hand out the notes
//! it actually holds.
//!
//! # Invariants
//! - Counts never go negative (`checked_sub` fails instead)
//! - Counts never wrap or saturate (`checked_add` fails instead)
//! - `amount()` is always the weighted sum of the counts
//! - `allocate(amount)` only ever returns a subset of the loaded notes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported note/coin denominations, in whole currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denomination {
    One,
    Two,
    Five,
    Ten,
    Twenty,
    Fifty,
    Hundred,
}

impl Denomination {
    /// All denominations, largest first (allocation order)
    pub const DESCENDING: [Denomination; 7] = [
        Denomination::Hundred,
        Denomination::Fifty,
        Denomination::Twenty,
        Denomination::Ten,
        Denomination::Five,
        Denomination::Two,
        Denomination::One,
    ];

    /// Face value in whole currency units
    pub fn value(self) -> u64 {
        match self {
            Denomination::One => 1,
            Denomination::Two => 2,
            Denomination::Five => 5,
            Denomination::Ten => 10,
            Denomination::Twenty => 20,
            Denomination::Fifty => 50,
            Denomination::Hundred => 100,
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Counts of each denomination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub one: u32,
    pub two: u32,
    pub five: u32,
    pub ten: u32,
    pub twenty: u32,
    pub fifty: u32,
    pub hundred: u32,
}

impl Money {
    /// Empty money
    pub const ZERO: Money = Money {
        one: 0,
        two: 0,
        five: 0,
        ten: 0,
        twenty: 0,
        fifty: 0,
        hundred: 0,
    };

    /// Build money holding `count` notes of a single denomination
    pub fn of(denomination: Denomination, count: u32) -> Self {
        Self::ZERO.with(denomination, count)
    }

    /// Return a copy with the count for `denomination` replaced
    pub fn with(mut self, denomination: Denomination, count: u32) -> Self {
        *self.slot_mut(denomination) = count;
        self
    }

    /// Number of notes held for a denomination
    pub fn count(&self, denomination: Denomination) -> u32 {
        match denomination {
            Denomination::One => self.one,
            Denomination::Two => self.two,
            Denomination::Five => self.five,
            Denomination::Ten => self.ten,
            Denomination::Twenty => self.twenty,
            Denomination::Fifty => self.fifty,
            Denomination::Hundred => self.hundred,
        }
    }

    fn slot_mut(&mut self, denomination: Denomination) -> &mut u32 {
        match denomination {
            Denomination::One => &mut self.one,
            Denomination::Two => &mut self.two,
            Denomination::Five => &mut self.five,
            Denomination::Ten => &mut self.ten,
            Denomination::Twenty => &mut self.twenty,
            Denomination::Fifty => &mut self.fifty,
            Denomination::Hundred => &mut self.hundred,
        }
    }

    /// Total value in whole currency units
    pub fn amount(&self) -> u64 {
        Denomination::DESCENDING
            .iter()
            .map(|d| d.value() * u64::from(self.count(*d)))
            .sum()
    }

    /// True when no notes are held
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Per-denomination sum, `None` if any count would overflow
    pub fn checked_add(&self, other: &Money) -> Option<Money> {
        let mut sum = *self;
        for d in Denomination::DESCENDING {
            *sum.slot_mut(d) = self.count(d).checked_add(other.count(d))?;
        }
        Some(sum)
    }

    /// Per-denomination difference, `None` if any count would underflow
    pub fn checked_sub(&self, other: &Money) -> Option<Money> {
        let mut diff = *self;
        for d in Denomination::DESCENDING {
            *diff.slot_mut(d) = self.count(d).checked_sub(other.count(d))?;
        }
        Some(diff)
    }

    /// Pick notes summing to exactly `amount` from what is held
    ///
    /// Greedy from the largest denomination down. Returns `None` when the
    /// held notes cannot represent the amount this way.
    pub fn allocate(&self, amount: u64) -> Option<Money> {
        let mut remaining = amount;
        let mut picked = Money::ZERO;
        for d in Denomination::DESCENDING {
            let wanted = remaining / d.value();
            let take = wanted.min(u64::from(self.count(d)));
            if take > 0 {
                // take <= count(d), which is a u32
                *picked.slot_mut(d) = take as u32;
                remaining -= take * d.value();
            }
        }
        (remaining == 0).then_some(picked)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.amount())
    }
}
