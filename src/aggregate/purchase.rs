// Copyright (c) 2025 - Cowboy AI, Inc.
//! Purchase Aggregate
//!
//! Immutable record of one sale. Initialized once, right after the machine
//! committed the matching `SnackBought`; never removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::PurchaseCommand;
use super::{Aggregate, CommandContext};
use crate::domain::invariants::{validate_not_created, validate_operator};
use crate::domain::{AggregateKind, ValidationFailure, ValidationReport};
use crate::events::{ErrorCode, EventEnvelope, PurchaseEvent, VendingEvent};

/// Purchase State
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub version: u64,
    pub is_created: bool,

    pub machine_id: Uuid,
    pub position: u32,
    pub snack_id: Uuid,
    pub bought_price: u64,
    pub bought_at: Option<DateTime<Utc>>,
    pub bought_by: Option<String>,
}

impl Aggregate for Purchase {
    const KIND: AggregateKind = AggregateKind::Purchase;

    type Command = PurchaseCommand;
    type Event = PurchaseEvent;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            is_created: false,
            machine_id: Uuid::nil(),
            position: 0,
            snack_id: Uuid::nil(),
            bought_price: 0,
            bought_at: None,
            bought_by: None,
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
        false
    }

    fn error_code(_command: &PurchaseCommand) -> ErrorCode {
        ErrorCode::PurchaseInitialize
    }

    fn validate(&self, command: &PurchaseCommand, ctx: &CommandContext) -> ValidationReport {
        let mut report = ValidationReport::new();
        report
            .check(validate_operator(&ctx.operated_by))
            .check(validate_not_created(Self::KIND, self.id, self.is_created));

        let PurchaseCommand::Initialize { bought_price, .. } = command;
        if *bought_price == 0 {
            report.check(Err(ValidationFailure::InvalidPrice));
        }

        report
    }

    fn handle(
        &self,
        command: PurchaseCommand,
        ctx: &CommandContext,
    ) -> Result<PurchaseEvent, ValidationReport> {
        self.validate(&command, ctx).into_result()?;

        let PurchaseCommand::Initialize {
            machine_id,
            position,
            snack_id,
            bought_price,
        } = command;

        Ok(PurchaseEvent::Initialized {
            machine_id,
            position,
            snack_id,
            bought_price,
        })
    }

    fn apply(self, envelope: &EventEnvelope<PurchaseEvent>) -> Self {
        match &envelope.event {
            PurchaseEvent::Initialized {
                machine_id,
                position,
                snack_id,
                bought_price,
            } => Purchase {
                version: envelope.version,
                is_created: true,
                machine_id: *machine_id,
                position: *position,
                snack_id: *snack_id,
                bought_price: *bought_price,
                bought_at: Some(envelope.operated_at),
                bought_by: Some(envelope.operated_by.clone()),
                ..self
            },
        }
    }

    fn broadcast(envelope: &EventEnvelope<PurchaseEvent>) -> Option<VendingEvent> {
        Some(VendingEvent::Purchase(envelope.clone()))
    }
}
