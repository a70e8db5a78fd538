// Copyright (c) 2025 - Cowboy AI, Inc.
//! Vending Broadcast Events
//!
//! Top-level envelope for events fanned out on the broadcast stream.
//! Only the aggregate kinds whose events other aggregates' read models
//! depend on are broadcast: machines (snack stock statistics) and purchases
//! (sales statistics). Snack events stay on their per-key stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::{DomainEvent, EventEnvelope};
use super::machine::MachineEvent;
use super::purchase::PurchaseEvent;
use crate::domain::AggregateKind;

/// Vending broadcast events
///
/// Each variant wraps the full envelope of one broadcast aggregate kind,
/// so consumers match exhaustively and stay type safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "aggregate_type", content = "event", rename_all = "snake_case")]
pub enum VendingEvent {
    Machine(EventEnvelope<MachineEvent>),
    Purchase(EventEnvelope<PurchaseEvent>),
}

impl VendingEvent {
    pub fn aggregate_kind(&self) -> AggregateKind {
        match self {
            VendingEvent::Machine(_) => AggregateKind::Machine,
            VendingEvent::Purchase(_) => AggregateKind::Purchase,
        }
    }

    pub fn aggregate_id(&self) -> Uuid {
        match self {
            VendingEvent::Machine(envelope) => envelope.aggregate_id,
            VendingEvent::Purchase(envelope) => envelope.aggregate_id,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            VendingEvent::Machine(envelope) => envelope.version,
            VendingEvent::Purchase(envelope) => envelope.version,
        }
    }

    pub fn trace_id(&self) -> Uuid {
        match self {
            VendingEvent::Machine(envelope) => envelope.trace_id,
            VendingEvent::Purchase(envelope) => envelope.trace_id,
        }
    }

    pub fn operated_at(&self) -> DateTime<Utc> {
        match self {
            VendingEvent::Machine(envelope) => envelope.operated_at,
            VendingEvent::Purchase(envelope) => envelope.operated_at,
        }
    }

    pub fn event_type_name(&self) -> &'static str {
        match self {
            VendingEvent::Machine(envelope) => envelope.event.event_type_name(),
            VendingEvent::Purchase(envelope) => envelope.event.event_type_name(),
        }
    }
}
