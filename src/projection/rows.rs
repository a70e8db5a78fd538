// Copyright (c) 2025 - Cowboy AI, Inc.
//! Read-model rows
//!
//! Each row carries a denormalized copy of its aggregate, its own version
//! stamp and counters sourced from other aggregate kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notice::ProjectionNotice;
use super::ProjectionRow;
use crate::domain::{AggregateKind, Money, Slot};

/// Machine row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInfo {
    pub id: Uuid,
    pub version: u64,

    pub slots: Vec<Slot>,
    pub slot_count: u32,

    pub money_inside: Money,
    pub money_inside_amount: u64,
    pub amount_in_transaction: u64,

    /// Distinct snacks in the slots
    pub snack_count: u32,
    pub snack_quantity: u64,
    pub snack_amount: u64,

    /// Sales recorded by purchases of this machine
    pub bought_count: u64,
    pub bought_amount: u64,

    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl MachineInfo {
    /// Recompute every field derived from `slots` and `money_inside`
    pub fn refresh_totals(&mut self) {
        self.slot_count = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.money_inside_amount = self.money_inside.amount();

        let piles: Vec<_> = self
            .slots
            .iter()
            .filter_map(|slot| slot.snack_pile)
            .filter(|pile| pile.quantity > 0)
            .collect();

        let mut snack_ids: Vec<Uuid> = piles.iter().map(|pile| pile.snack_id).collect();
        snack_ids.sort();
        snack_ids.dedup();

        self.snack_count = u32::try_from(snack_ids.len()).unwrap_or(u32::MAX);
        self.snack_quantity = piles.iter().map(|pile| u64::from(pile.quantity)).sum();
        self.snack_amount = piles.iter().map(|pile| pile.amount()).sum();
    }
}

impl ProjectionRow for MachineInfo {
    const KIND: AggregateKind = AggregateKind::Machine;

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn search_text(&self) -> Vec<&str> {
        [
            self.created_by.as_deref(),
            self.last_modified_by.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn saved(self) -> ProjectionNotice {
        ProjectionNotice::MachineInfoSaved(self)
    }

    fn removed(id: Uuid) -> ProjectionNotice {
        ProjectionNotice::MachineInfoRemoved { id }
    }
}

/// Snack row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnackInfo {
    pub id: Uuid,
    pub version: u64,

    pub name: String,
    pub picture_url: Option<String>,

    /// Live machines holding this snack
    pub machine_count: u32,
    pub total_quantity: u64,
    pub total_amount: u64,

    pub bought_count: u64,
    pub bought_amount: u64,

    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl ProjectionRow for SnackInfo {
    const KIND: AggregateKind = AggregateKind::Snack;

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.name.as_str()];
        text.extend(self.picture_url.as_deref());
        text
    }

    fn saved(self) -> ProjectionNotice {
        ProjectionNotice::SnackInfoSaved(self)
    }

    fn removed(id: Uuid) -> ProjectionNotice {
        ProjectionNotice::SnackInfoRemoved { id }
    }
}

/// Purchase row, with the snack's display fields cached in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInfo {
    pub id: Uuid,
    pub version: u64,

    pub machine_id: Uuid,
    pub position: u32,
    pub snack_id: Uuid,
    pub snack_name: String,
    pub snack_picture_url: Option<String>,

    pub bought_price: u64,
    pub bought_at: Option<DateTime<Utc>>,
    pub bought_by: Option<String>,
}

impl ProjectionRow for PurchaseInfo {
    const KIND: AggregateKind = AggregateKind::Purchase;

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.snack_name.as_str()];
        text.extend(self.bought_by.as_deref());
        text
    }

    fn saved(self) -> ProjectionNotice {
        ProjectionNotice::PurchaseInfoSaved(self)
    }

    fn removed(id: Uuid) -> ProjectionNotice {
        ProjectionNotice::PurchaseInfoRemoved { id }
    }
}
