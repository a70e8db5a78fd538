// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Aggregates
//!
//! This module provides the functional aggregate pattern for event sourcing:
//! - Validation is a pure function: (State, Command) → ValidationReport
//! - Handling is a pure function: (State, Command) → Result<Event, ValidationReport>
//! - State reconstruction via event folding: [Envelope] → State
//! - No I/O, no clock reads, no mutation of the input state
//!
//! # Event Sourcing Pattern
//!
//! ```text
//! Command → Aggregate::handle → Event → EventEnvelope (version + 1)
//!    ↓             ↓                          ↓
//! Intent      Validation                 Aggregate::apply → next state
//! ```
//!
//! The [`crate::runtime::AggregateHost`] owns the I/O around these functions:
//! it serializes commands per key, persists the next state and publishes the
//! envelope.
//!
//! # Fold Pattern
//!
//! ```rust,ignore
//! let state = Machine::from_events(machine_id, &envelopes);
//! ```
//!
//! # Design Principles
//!
//! ## 1. Command-Event Separation
//! - Commands express intent (what should happen)
//! - Events express facts (what did happen)
//! - Commands can fail, events cannot
//!
//! ## 2. All failures at once
//! - Every rule runs, every failure is reported
//! - A rejected command never produces an event
//!
//! ## 3. Explicit time
//! - [`CommandContext`] carries `operated_at`; aggregates never read the clock

pub mod commands;
pub mod machine;
pub mod purchase;
pub mod snack;

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use crate::domain::{AggregateKind, ValidationReport};
use crate::events::{DomainEvent, ErrorCode, EventEnvelope, VendingEvent};

pub use commands::{MachineCommand, PurchaseCommand, SnackCommand};
pub use machine::Machine;
pub use purchase::Purchase;
pub use snack::Snack;

/// Ambient data every command executes with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Correlates the resulting event (or error event) with this command
    pub trace_id: Uuid,

    /// Explicit time parameter
    pub operated_at: DateTime<Utc>,

    /// Who or what issued the command; must be non-empty
    pub operated_by: String,
}

impl CommandContext {
    pub fn new(operated_by: impl Into<String>, operated_at: DateTime<Utc>) -> Self {
        Self {
            trace_id: Uuid::now_v7(),
            operated_at,
            operated_by: operated_by.into(),
        }
    }

    pub fn with_trace_id(mut self, trace_id: Uuid) -> Self {
        self.trace_id = trace_id;
        self
    }
}

/// An event-sourced aggregate
///
/// Implementors are immutable values; `apply` consumes the state and returns
/// the next one.
pub trait Aggregate: Clone + fmt::Debug + Send + Sync + 'static {
    /// Which of the three aggregate types this is
    const KIND: AggregateKind;

    type Command: Clone + fmt::Debug + Send + Sync + 'static;
    type Event: DomainEvent;

    /// Blank state for a key that has never seen an event
    fn new(id: Uuid) -> Self;

    fn id(&self) -> Uuid;

    /// Version of the last applied event (0 before the first one)
    fn version(&self) -> u64;

    fn is_created(&self) -> bool;

    fn is_deleted(&self) -> bool;

    /// Stable numeric code reported when this command is rejected
    fn error_code(command: &Self::Command) -> ErrorCode;

    /// Run every rule for the command against the current state
    fn validate(&self, command: &Self::Command, ctx: &CommandContext) -> ValidationReport;

    /// Validate and, on success, describe the transition as one event
    fn handle(
        &self,
        command: Self::Command,
        ctx: &CommandContext,
    ) -> Result<Self::Event, ValidationReport>;

    /// Fold one committed event into the state
    ///
    /// No validation happens here; the event is a fact.
    fn apply(self, envelope: &EventEnvelope<Self::Event>) -> Self;

    /// Broadcast form of a committed event, for kinds other aggregates depend on
    fn broadcast(_envelope: &EventEnvelope<Self::Event>) -> Option<VendingEvent> {
        None
    }

    /// Reconstruct state from an event stream
    fn from_events(id: Uuid, events: &[EventEnvelope<Self::Event>]) -> Self {
        events
            .iter()
            .fold(Self::new(id), |state, envelope| state.apply(envelope))
    }
}
