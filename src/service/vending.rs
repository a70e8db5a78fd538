// Copyright (c) 2025 - Cowboy AI, Inc.
//! Vending Service
//!
//! Typed operations over the three aggregate hosts.
//!
//! # Buy orchestration
//!
//! ```text
//! buy_snack(machine, position)
//!     purchase_id ← new v7 id
//!     machine.BuySnack { position, purchase_id }   ── rejected → error, nothing else runs
//!         ↓ committed
//!     purchase.Initialize { machine, position, snack, price }   (same trace id)
//! ```

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::aggregate::{
    CommandContext, Machine, MachineCommand, Purchase, PurchaseCommand, Snack, SnackCommand,
};
use crate::domain::{AggregateKind, Money, Slot, SnackPile};
use crate::errors::RuntimeError;
use crate::runtime::{AggregateHost, ExecuteError};

/// Service layer result type
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service layer errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A command failed validation; an error event was published
    #[error("Command rejected with code {code}: {}", .reasons.join("; "))]
    Rejected { code: u16, reasons: Vec<String> },

    #[error("{kind} {id} not found")]
    NotFound { kind: AggregateKind, id: Uuid },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<ExecuteError> for ServiceError {
    fn from(err: ExecuteError) -> Self {
        match err {
            ExecuteError::Rejected { code, reasons } => ServiceError::Rejected { code, reasons },
            ExecuteError::Runtime(e) => ServiceError::Runtime(e),
        }
    }
}

impl ServiceError {
    /// Stable code of a rejected command
    pub fn code(&self) -> Option<u16> {
        match self {
            ServiceError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result of a successful purchase
#[derive(Debug, Clone)]
pub struct Receipt {
    pub purchase_id: Uuid,
    pub machine: Machine,
    pub purchase: Purchase,
}

pub struct VendingService {
    machines: Arc<AggregateHost<Machine>>,
    snacks: Arc<AggregateHost<Snack>>,
    purchases: Arc<AggregateHost<Purchase>>,
}

impl VendingService {
    pub fn new(
        machines: Arc<AggregateHost<Machine>>,
        snacks: Arc<AggregateHost<Snack>>,
        purchases: Arc<AggregateHost<Purchase>>,
    ) -> Self {
        Self {
            machines,
            snacks,
            purchases,
        }
    }

    // Snacks

    pub async fn initialize_snack(
        &self,
        id: Uuid,
        name: impl Into<String>,
        picture_url: Option<String>,
        ctx: &CommandContext,
    ) -> ServiceResult<Snack> {
        let command = SnackCommand::Initialize {
            name: name.into(),
            picture_url,
        };
        Ok(self.snacks.execute(id, command, ctx).await?)
    }

    pub async fn remove_snack(&self, id: Uuid, ctx: &CommandContext) -> ServiceResult<Snack> {
        Ok(self.snacks.execute(id, SnackCommand::Remove, ctx).await?)
    }

    pub async fn change_snack_name(
        &self,
        id: Uuid,
        name: impl Into<String>,
        ctx: &CommandContext,
    ) -> ServiceResult<Snack> {
        let command = SnackCommand::ChangeName { name: name.into() };
        Ok(self.snacks.execute(id, command, ctx).await?)
    }

    pub async fn change_snack_picture_url(
        &self,
        id: Uuid,
        picture_url: Option<String>,
        ctx: &CommandContext,
    ) -> ServiceResult<Snack> {
        let command = SnackCommand::ChangePictureUrl { picture_url };
        Ok(self.snacks.execute(id, command, ctx).await?)
    }

    // Machines

    pub async fn initialize_machine(
        &self,
        id: Uuid,
        slots: Vec<Slot>,
        money_inside: Money,
        ctx: &CommandContext,
    ) -> ServiceResult<Machine> {
        let command = MachineCommand::Initialize {
            slots,
            money_inside,
        };
        self.machine(id, command, ctx).await
    }

    pub async fn remove_machine(&self, id: Uuid, ctx: &CommandContext) -> ServiceResult<Machine> {
        self.machine(id, MachineCommand::Remove, ctx).await
    }

    pub async fn add_slot(&self, id: Uuid, position: u32, ctx: &CommandContext) -> ServiceResult<Machine> {
        self.machine(id, MachineCommand::AddSlot { position }, ctx).await
    }

    pub async fn remove_slot(
        &self,
        id: Uuid,
        position: u32,
        ctx: &CommandContext,
    ) -> ServiceResult<Machine> {
        self.machine(id, MachineCommand::RemoveSlot { position }, ctx).await
    }

    pub async fn load_money(&self, id: Uuid, money: Money, ctx: &CommandContext) -> ServiceResult<Machine> {
        self.machine(id, MachineCommand::LoadMoney { money }, ctx).await
    }

    pub async fn unload_money(&self, id: Uuid, ctx: &CommandContext) -> ServiceResult<Machine> {
        self.machine(id, MachineCommand::UnloadMoney, ctx).await
    }

    pub async fn insert_money(
        &self,
        id: Uuid,
        money: Money,
        ctx: &CommandContext,
    ) -> ServiceResult<Machine> {
        self.machine(id, MachineCommand::InsertMoney { money }, ctx).await
    }

    pub async fn return_money(&self, id: Uuid, ctx: &CommandContext) -> ServiceResult<Machine> {
        self.machine(id, MachineCommand::ReturnMoney, ctx).await
    }

    pub async fn load_snacks(
        &self,
        id: Uuid,
        position: u32,
        snack_pile: SnackPile,
        ctx: &CommandContext,
    ) -> ServiceResult<Machine> {
        let command = MachineCommand::LoadSnacks {
            position,
            snack_pile,
        };
        self.machine(id, command, ctx).await
    }

    pub async fn unload_snacks(
        &self,
        id: Uuid,
        position: u32,
        ctx: &CommandContext,
    ) -> ServiceResult<Machine> {
        self.machine(id, MachineCommand::UnloadSnacks { position }, ctx).await
    }

    async fn machine(
        &self,
        id: Uuid,
        command: MachineCommand,
        ctx: &CommandContext,
    ) -> ServiceResult<Machine> {
        Ok(self.machines.execute(id, command, ctx).await?)
    }

    /// Sell one unit from a slot and record the purchase
    ///
    /// # Errors
    ///
    /// - `ServiceError::Rejected` if the machine rejected the buy; no
    ///   purchase exists afterwards
    /// - `ServiceError::Runtime` if a host could not load or save state
    pub async fn buy_snack(
        &self,
        machine_id: Uuid,
        position: u32,
        ctx: &CommandContext,
    ) -> ServiceResult<Receipt> {
        let purchase_id = Uuid::now_v7();
        let machine = self
            .machines
            .execute(
                machine_id,
                MachineCommand::BuySnack {
                    position,
                    purchase_id,
                },
                ctx,
            )
            .await?;

        // The sold slot keeps its pile (possibly at zero units).
        let pile = machine
            .slot(position)
            .and_then(|slot| slot.snack_pile)
            .ok_or(ServiceError::NotFound {
                kind: AggregateKind::Machine,
                id: machine_id,
            })?;

        let command = PurchaseCommand::Initialize {
            machine_id,
            position,
            snack_id: pile.snack_id,
            bought_price: pile.price,
        };
        let purchase = match self.purchases.execute(purchase_id, command, ctx).await {
            Ok(purchase) => purchase,
            Err(e) => {
                error!(
                    machine_id = %machine_id,
                    purchase_id = %purchase_id,
                    trace_id = %ctx.trace_id,
                    error = %e,
                    "Snack sold but purchase not recorded"
                );
                return Err(e.into());
            }
        };

        info!(
            machine_id = %machine_id,
            purchase_id = %purchase_id,
            snack_id = %pile.snack_id,
            price = pile.price,
            "Snack bought"
        );
        Ok(Receipt {
            purchase_id,
            machine,
            purchase,
        })
    }

    // Queries

    pub async fn get_machine(&self, id: Uuid) -> ServiceResult<Machine> {
        self.machines
            .find(id)
            .await?
            .ok_or(ServiceError::NotFound {
                kind: AggregateKind::Machine,
                id,
            })
    }

    pub async fn get_snack(&self, id: Uuid) -> ServiceResult<Snack> {
        self.snacks.find(id).await?.ok_or(ServiceError::NotFound {
            kind: AggregateKind::Snack,
            id,
        })
    }

    pub async fn get_purchase(&self, id: Uuid) -> ServiceResult<Purchase> {
        self.purchases
            .find(id)
            .await?
            .ok_or(ServiceError::NotFound {
                kind: AggregateKind::Purchase,
                id,
            })
    }
}
