// Copyright (c) 2025 - Cowboy AI, Inc.
//! Machine projection
//!
//! Deltas keep slots, money and lifecycle fields current. Sales counters
//! only change through a rebuild, triggered when a purchase is broadcast.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::projector::RowProjection;
use super::reconciler::SnapshotSource;
use super::rows::MachineInfo;
use super::{ProjectionError, ProjectionResult, ProjectionRow};
use crate::aggregate::Machine;
use crate::domain::slot::replace_slot;
use crate::events::{DomainEvent, EventEnvelope, MachineEvent};
use crate::runtime::AggregateHost;
use crate::stats::{SalesStats, StatsSource};

/// Row for a machine state plus its sales
pub fn machine_info(machine: &Machine, sales: SalesStats) -> MachineInfo {
    let mut row = MachineInfo {
        id: machine.id,
        version: machine.version,
        slots: machine.slots.clone(),
        slot_count: 0,
        money_inside: machine.money_inside,
        money_inside_amount: 0,
        amount_in_transaction: machine.amount_in_transaction,
        snack_count: 0,
        snack_quantity: 0,
        snack_amount: 0,
        bought_count: sales.count,
        bought_amount: sales.amount,
        created_at: machine.created_at,
        created_by: machine.created_by.clone(),
        last_modified_at: machine.last_modified_at,
        last_modified_by: machine.last_modified_by.clone(),
        is_deleted: machine.is_deleted,
        deleted_at: machine.deleted_at,
        deleted_by: machine.deleted_by.clone(),
    };
    row.refresh_totals();
    row
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MachineProjection;

fn invalid(envelope: &EventEnvelope<MachineEvent>) -> ProjectionError {
    ProjectionError::InvalidEvent {
        kind: MachineInfo::KIND,
        id: envelope.aggregate_id,
        event_type: envelope.event_type_name(),
    }
}

#[async_trait]
impl RowProjection for MachineProjection {
    type Event = MachineEvent;
    type Row = MachineInfo;

    async fn create(&self, envelope: &EventEnvelope<MachineEvent>) -> ProjectionResult<MachineInfo> {
        let MachineEvent::Initialized {
            slots,
            money_inside,
        } = &envelope.event
        else {
            return Err(invalid(envelope));
        };

        let mut row = MachineInfo {
            id: envelope.aggregate_id,
            version: envelope.version,
            slots: slots.clone(),
            slot_count: 0,
            money_inside: *money_inside,
            money_inside_amount: 0,
            amount_in_transaction: 0,
            snack_count: 0,
            snack_quantity: 0,
            snack_amount: 0,
            bought_count: 0,
            bought_amount: 0,
            created_at: Some(envelope.operated_at),
            created_by: Some(envelope.operated_by.clone()),
            last_modified_at: Some(envelope.operated_at),
            last_modified_by: Some(envelope.operated_by.clone()),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        };
        row.refresh_totals();
        Ok(row)
    }

    async fn apply(
        &self,
        mut row: MachineInfo,
        envelope: &EventEnvelope<MachineEvent>,
    ) -> ProjectionResult<MachineInfo> {
        match &envelope.event {
            MachineEvent::Initialized { .. } => return Err(invalid(envelope)),
            MachineEvent::Removed { .. } => {
                row.is_deleted = true;
                row.deleted_at = Some(envelope.operated_at);
                row.deleted_by = Some(envelope.operated_by.clone());
            }
            MachineEvent::SlotAdded { slot } => row.slots.push(*slot),
            MachineEvent::SlotRemoved { position } => {
                row.slots.retain(|slot| slot.position != *position);
            }
            MachineEvent::MoneyLoaded { money_inside, .. }
            | MachineEvent::MoneyUnloaded { money_inside, .. } => {
                row.money_inside = *money_inside;
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
                row.money_inside = *money_inside;
                row.amount_in_transaction = *amount_in_transaction;
            }
            MachineEvent::SnacksLoaded { slot } | MachineEvent::SnacksUnloaded { slot, .. } => {
                row.slots = replace_slot(&row.slots, *slot);
            }
            MachineEvent::SnackBought {
                slot,
                amount_in_transaction,
                ..
            } => {
                row.slots = replace_slot(&row.slots, *slot);
                row.amount_in_transaction = *amount_in_transaction;
            }
        }

        row.last_modified_at = Some(envelope.operated_at);
        row.last_modified_by = Some(envelope.operated_by.clone());
        row.refresh_totals();
        Ok(row)
    }

    fn stamp(mut row: MachineInfo, version: u64) -> MachineInfo {
        row.version = version;
        row
    }
}

/// Machine snapshots with their sales
pub struct MachineSnapshots {
    machines: Arc<AggregateHost<Machine>>,
    stats: Arc<dyn StatsSource>,
}

impl MachineSnapshots {
    pub fn new(machines: Arc<AggregateHost<Machine>>, stats: Arc<dyn StatsSource>) -> Self {
        Self { machines, stats }
    }
}

#[async_trait]
impl SnapshotSource<MachineInfo> for MachineSnapshots {
    async fn snapshot(&self, id: Uuid) -> ProjectionResult<Option<MachineInfo>> {
        let Some(machine) = self.machines.find(id).await? else {
            return Ok(None);
        };
        let sales = self.stats.machine_sales(id).await?;
        Ok(Some(machine_info(&machine, sales)))
    }

    async fn ids(&self) -> ProjectionResult<Vec<Uuid>> {
        Ok(self.machines.ids().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Denomination, Money, Slot, SnackPile};
    use chrono::Utc;

    fn envelope(version: u64, event: MachineEvent) -> EventEnvelope<MachineEvent> {
        EventEnvelope {
            event_id: Uuid::now_v7(),
            aggregate_id: Uuid::nil(),
            version,
            trace_id: Uuid::now_v7(),
            operated_at: Utc::now(),
            operated_by: "operator".to_string(),
            event,
        }
    }

    #[tokio::test]
    async fn test_create_with_no_slots() {
        let row = MachineProjection
            .create(&envelope(
                1,
                MachineEvent::Initialized {
                    slots: vec![],
                    money_inside: Money::ZERO,
                },
            ))
            .await
            .unwrap();

        assert_eq!(row.version, 1);
        assert_eq!(row.slot_count, 0);
        assert_eq!(row.created_by.as_deref(), Some("operator"));
    }

    #[tokio::test]
    async fn test_apply_keeps_totals_current() {
        // Arrange
        let snack_id = Uuid::now_v7();
        let row = MachineProjection
            .create(&envelope(
                1,
                MachineEvent::Initialized {
                    slots: vec![Slot::empty(1)],
                    money_inside: Money::ZERO,
                },
            ))
            .await
            .unwrap();
        let loaded = Slot {
            position: 1,
            snack_pile: Some(SnackPile {
                snack_id,
                quantity: 4,
                price: 2,
            }),
        };

        // Act
        let row = MachineProjection
            .apply(row, &envelope(2, MachineEvent::SnacksLoaded { slot: loaded }))
            .await
            .unwrap();
        let row = MachineProjection
            .apply(
                row,
                &envelope(
                    3,
                    MachineEvent::MoneyInserted {
                        money: Money::of(Denomination::Five, 1),
                        money_inside: Money::of(Denomination::Five, 1),
                        amount_in_transaction: 5,
                    },
                ),
            )
            .await
            .unwrap();

        // Assert
        assert_eq!(row.snack_count, 1);
        assert_eq!(row.snack_quantity, 4);
        assert_eq!(row.snack_amount, 8);
        assert_eq!(row.money_inside_amount, 5);
        assert_eq!(row.amount_in_transaction, 5);
        assert_eq!(row.bought_count, 0);
    }

    #[tokio::test]
    async fn test_reinitialize_is_invalid() {
        let initialized = MachineEvent::Initialized {
            slots: vec![],
            money_inside: Money::ZERO,
        };
        let row = MachineProjection
            .create(&envelope(1, initialized.clone()))
            .await
            .unwrap();

        let result = MachineProjection.apply(row, &envelope(2, initialized)).await;

        assert!(matches!(result, Err(ProjectionError::InvalidEvent { .. })));
    }
}
