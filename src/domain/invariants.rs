// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Domain Invariants
//!
//! Every business rule a command must satisfy lives here as a small pure
//! function returning a [`ValidationResult`]. Command handlers run all the
//! rules that apply and collect the failures into a [`ValidationReport`], so
//! a rejected command reports every broken rule at once rather than the
//! first one.
//!
//! # Invariant Categories
//!
//! 1. **Lifecycle**: created / not created / not removed
//! 2. **Attribution**: every command names who operated it
//! 3. **Money**: transaction state, non-empty amounts, representable payouts
//! 4. **Slots**: existence, uniqueness, stock

use uuid::Uuid;

use super::kind::AggregateKind;
use super::money::Money;
use super::slot::{find_slot, Slot, SnackPile};

/// Maximum length of a snack name
pub const MAX_SNACK_NAME_LEN: usize = 100;

/// Validation result for a single rule
pub type ValidationResult = Result<(), ValidationFailure>;

/// A single broken business rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("Operator must not be empty")]
    MissingOperator,

    #[error("{kind} {id} is not initialized")]
    NotInitialized { kind: AggregateKind, id: Uuid },

    #[error("{kind} {id} is already initialized")]
    AlreadyInitialized { kind: AggregateKind, id: Uuid },

    #[error("{kind} {id} is already removed")]
    AlreadyRemoved { kind: AggregateKind, id: Uuid },

    #[error("Machine is still in transaction ({amount} inserted)")]
    StillInTransaction { amount: u64 },

    #[error("Machine has no money in transaction")]
    NotInTransaction,

    #[error("Money must contain at least one note")]
    EmptyMoney,

    #[error("Money does not fit in the cash box")]
    MoneyOverflow,

    #[error("Slot {position} cannot hold more snacks")]
    QuantityOverflow { position: u32 },

    #[error("Amount {amount} cannot be paid out with the money loaded")]
    CannotAllocate { amount: u64 },

    #[error("Insufficient funds: price {price}, inserted {available}")]
    InsufficientFunds { price: u64, available: u64 },

    #[error("Slot {position} does not exist")]
    SlotNotFound { position: u32 },

    #[error("Slot {position} already exists")]
    SlotAlreadyExists { position: u32 },

    #[error("Slot position {position} appears more than once")]
    DuplicateSlotPosition { position: u32 },

    #[error("Slot {position} still holds snacks")]
    SlotNotEmpty { position: u32 },

    #[error("Slot {position} has no stock")]
    SlotHasNoStock { position: u32 },

    #[error("Slot {position} holds snack {loaded}, cannot load snack {requested}")]
    SnackMismatch {
        position: u32,
        loaded: Uuid,
        requested: Uuid,
    },

    #[error("Snack quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Snack price must be greater than zero")]
    InvalidPrice,

    #[error("Invalid snack name: {0}")]
    InvalidSnackName(String),
}

/// Composite outcome of running several rules
///
/// Empty means the command is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one rule
    pub fn check(&mut self, result: ValidationResult) -> &mut Self {
        if let Err(failure) = result {
            self.failures.push(failure);
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Human-readable reasons, one per failure
    pub fn reasons(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }

    /// `Ok(())` when valid, otherwise the report itself
    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn validate_operator(operated_by: &str) -> ValidationResult {
    if operated_by.trim().is_empty() {
        return Err(ValidationFailure::MissingOperator);
    }
    Ok(())
}

pub fn validate_created(kind: AggregateKind, id: Uuid, is_created: bool) -> ValidationResult {
    if !is_created {
        return Err(ValidationFailure::NotInitialized { kind, id });
    }
    Ok(())
}

pub fn validate_not_created(kind: AggregateKind, id: Uuid, is_created: bool) -> ValidationResult {
    if is_created {
        return Err(ValidationFailure::AlreadyInitialized { kind, id });
    }
    Ok(())
}

pub fn validate_not_deleted(kind: AggregateKind, id: Uuid, is_deleted: bool) -> ValidationResult {
    if is_deleted {
        return Err(ValidationFailure::AlreadyRemoved { kind, id });
    }
    Ok(())
}

/// Rules that apply to every command on an existing aggregate
pub fn validate_live(
    report: &mut ValidationReport,
    kind: AggregateKind,
    id: Uuid,
    is_created: bool,
    is_deleted: bool,
) {
    report
        .check(validate_created(kind, id, is_created))
        .check(validate_not_deleted(kind, id, is_deleted));
}

pub fn validate_not_in_transaction(amount_in_transaction: u64) -> ValidationResult {
    if amount_in_transaction > 0 {
        return Err(ValidationFailure::StillInTransaction {
            amount: amount_in_transaction,
        });
    }
    Ok(())
}

pub fn validate_in_transaction(amount_in_transaction: u64) -> ValidationResult {
    if amount_in_transaction == 0 {
        return Err(ValidationFailure::NotInTransaction);
    }
    Ok(())
}

pub fn validate_money_not_empty(money: &Money) -> ValidationResult {
    if money.is_zero() {
        return Err(ValidationFailure::EmptyMoney);
    }
    Ok(())
}

/// Adding `money` must not overflow any count or the transaction amount
pub fn validate_money_fits(
    money_inside: &Money,
    amount_in_transaction: u64,
    money: &Money,
) -> ValidationResult {
    let fits = money_inside.checked_add(money).is_some()
        && amount_in_transaction.checked_add(money.amount()).is_some();
    if !fits {
        return Err(ValidationFailure::MoneyOverflow);
    }
    Ok(())
}

/// The amount must be payable from the notes currently loaded
pub fn validate_allocatable(money_inside: &Money, amount: u64) -> ValidationResult {
    if money_inside.allocate(amount).is_none() {
        return Err(ValidationFailure::CannotAllocate { amount });
    }
    Ok(())
}

pub fn validate_unique_positions(slots: &[Slot]) -> ValidationResult {
    for (index, slot) in slots.iter().enumerate() {
        if slots[..index].iter().any(|s| s.position == slot.position) {
            return Err(ValidationFailure::DuplicateSlotPosition {
                position: slot.position,
            });
        }
    }
    Ok(())
}

pub fn validate_slot_exists(slots: &[Slot], position: u32) -> ValidationResult {
    if find_slot(slots, position).is_none() {
        return Err(ValidationFailure::SlotNotFound { position });
    }
    Ok(())
}

pub fn validate_slot_free(slots: &[Slot], position: u32) -> ValidationResult {
    if find_slot(slots, position).is_some() {
        return Err(ValidationFailure::SlotAlreadyExists { position });
    }
    Ok(())
}

/// Passes when the slot is missing (reported separately) or empty
pub fn validate_slot_empty(slots: &[Slot], position: u32) -> ValidationResult {
    match find_slot(slots, position) {
        Some(slot) if !slot.is_empty() => Err(ValidationFailure::SlotNotEmpty { position }),
        _ => Ok(()),
    }
}

/// Passes when the slot is missing (reported separately) or holds stock
pub fn validate_slot_has_stock(slots: &[Slot], position: u32) -> ValidationResult {
    match find_slot(slots, position) {
        Some(slot) if slot.is_empty() => Err(ValidationFailure::SlotHasNoStock { position }),
        _ => Ok(()),
    }
}

/// A slot may only be topped up with the snack it already holds
pub fn validate_same_snack(slots: &[Slot], position: u32, pile: &SnackPile) -> ValidationResult {
    let loaded = find_slot(slots, position).and_then(|slot| slot.snack_pile);
    match loaded {
        Some(loaded) if loaded.quantity > 0 && loaded.snack_id != pile.snack_id => {
            Err(ValidationFailure::SnackMismatch {
                position,
                loaded: loaded.snack_id,
                requested: pile.snack_id,
            })
        }
        _ => Ok(()),
    }
}

/// Topping up a slot must not overflow its quantity
pub fn validate_quantity_fits(slots: &[Slot], position: u32, pile: &SnackPile) -> ValidationResult {
    let loaded = find_slot(slots, position).and_then(|slot| slot.snack_pile);
    match loaded {
        Some(loaded)
            if loaded.snack_id == pile.snack_id
                && loaded.quantity.checked_add(pile.quantity).is_none() =>
        {
            Err(ValidationFailure::QuantityOverflow { position })
        }
        _ => Ok(()),
    }
}

pub fn validate_pile(report: &mut ValidationReport, pile: &SnackPile) {
    if pile.quantity == 0 {
        report.check(Err(ValidationFailure::InvalidQuantity));
    }
    if pile.price == 0 {
        report.check(Err(ValidationFailure::InvalidPrice));
    }
}

pub fn validate_sufficient_funds(price: u64, available: u64) -> ValidationResult {
    if available < price {
        return Err(ValidationFailure::InsufficientFunds { price, available });
    }
    Ok(())
}

pub fn validate_snack_name(name: &str) -> ValidationResult {
    if name.trim().is_empty() {
        return Err(ValidationFailure::InvalidSnackName(
            "name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_SNACK_NAME_LEN {
        return Err(ValidationFailure::InvalidSnackName(format!(
            "name longer than {} characters",
            MAX_SNACK_NAME_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Denomination;

    fn pile(quantity: u32, price: u64) -> SnackPile {
        SnackPile {
            snack_id: Uuid::nil(),
            quantity,
            price,
        }
    }

    #[test]
    fn test_report_collects_all_failures() {
        let id = Uuid::nil();
        let mut report = ValidationReport::new();
        report
            .check(validate_operator(""))
            .check(validate_created(AggregateKind::Machine, id, false))
            .check(validate_not_in_transaction(0));

        assert!(!report.is_valid());
        assert_eq!(report.failures().len(), 2);
        assert_eq!(report.reasons()[0], "Operator must not be empty");
        assert!(report.clone().into_result().is_err());
    }

    #[test]
    fn test_still_in_transaction_reason() {
        let failure = validate_not_in_transaction(5).unwrap_err();
        assert!(failure.to_string().contains("still in transaction"));
    }

    #[test]
    fn test_unique_positions() {
        let slots = vec![Slot::empty(1), Slot::empty(2), Slot::empty(1)];
        assert_eq!(
            validate_unique_positions(&slots),
            Err(ValidationFailure::DuplicateSlotPosition { position: 1 })
        );
        assert!(validate_unique_positions(&slots[..2]).is_ok());
    }

    #[test]
    fn test_slot_rules() {
        let slots = vec![
            Slot::empty(1),
            Slot {
                position: 2,
                snack_pile: Some(pile(3, 2)),
            },
        ];
        assert!(validate_slot_exists(&slots, 2).is_ok());
        assert!(validate_slot_exists(&slots, 9).is_err());
        assert!(validate_slot_free(&slots, 9).is_ok());
        assert!(validate_slot_empty(&slots, 2).is_err());
        assert!(validate_slot_has_stock(&slots, 1).is_err());
        assert!(validate_slot_has_stock(&slots, 2).is_ok());
    }

    #[test]
    fn test_same_snack() {
        let loaded = SnackPile {
            snack_id: Uuid::now_v7(),
            quantity: 1,
            price: 1,
        };
        let slots = vec![Slot {
            position: 1,
            snack_pile: Some(loaded),
        }];
        assert!(validate_same_snack(&slots, 1, &loaded).is_ok());
        assert!(matches!(
            validate_same_snack(&slots, 1, &pile(1, 1)),
            Err(ValidationFailure::SnackMismatch { .. })
        ));
    }

    #[test]
    fn test_allocatable() {
        let money = Money::of(Denomination::Ten, 1);
        assert!(validate_allocatable(&money, 10).is_ok());
        assert_eq!(
            validate_allocatable(&money, 5),
            Err(ValidationFailure::CannotAllocate { amount: 5 })
        );
    }

    #[test]
    fn test_money_fits() {
        let full = Money::of(Denomination::One, u32::MAX);
        let one = Money::of(Denomination::One, 1);
        assert!(validate_money_fits(&Money::ZERO, 0, &full).is_ok());
        assert_eq!(
            validate_money_fits(&full, 0, &one),
            Err(ValidationFailure::MoneyOverflow)
        );
        assert_eq!(
            validate_money_fits(&Money::ZERO, u64::MAX, &one),
            Err(ValidationFailure::MoneyOverflow)
        );
    }

    #[test]
    fn test_snack_name() {
        assert!(validate_snack_name("Cola").is_ok());
        assert!(validate_snack_name("  ").is_err());
        assert!(validate_snack_name(&"x".repeat(MAX_SNACK_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_pile_rules() {
        let mut report = ValidationReport::new();
        validate_pile(&mut report, &pile(0, 0));
        assert_eq!(report.failures().len(), 2);
    }
}
