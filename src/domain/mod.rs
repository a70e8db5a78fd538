// Copyright (c) 2025 - Cowboy AI, Inc.
//! Vending Domain Models
//!
//! Value objects and pure business rules shared by the machine, snack and
//! purchase aggregates.
//!
//! # Value Objects with Invariants
//!
//! - [`Money`] - counts per [`Denomination`], with exact-change allocation
//! - [`Slot`] / [`SnackPile`] - numbered machine slots and the stock they hold
//! - [`AggregateKind`] - the three aggregate types
//!
//! # Rules
//!
//! [`invariants`] holds every validation rule as a pure function; handlers
//! combine them into a [`ValidationReport`].

pub mod invariants;
pub mod kind;
pub mod money;
pub mod slot;

pub use invariants::{ValidationFailure, ValidationReport, ValidationResult};
pub use kind::AggregateKind;
pub use money::{Denomination, Money};
pub use slot::{Slot, SnackPile};
