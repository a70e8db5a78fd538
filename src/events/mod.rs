// Copyright (c) 2025 - Cowboy AI, Inc.
//! Vending Domain Events
//!
//! Events are immutable facts representing state changes that have occurred.
//!
//! # Event Sourcing Principles
//!
//! 1. **Events are immutable**: Once created, events never change
//! 2. **Events are past tense**: Named for what happened (Removed, not Remove)
//! 3. **Events are versioned per aggregate**: version N presupposes N−1
//! 4. **Events are traced**: each carries the trace id of its command
//!
//! # Event Flow
//!
//! ```text
//! Command → Aggregate → EventEnvelope → per-key stream ──→ Incremental projector
//!                              │
//!                              └──→ broadcast stream ──→ cross-aggregate listeners
//! ```
//!
//! # Module Organization
//!
//! - [`envelope`] - envelope, error event, stream message, error codes
//! - [`machine`], [`snack`], [`purchase`] - closed event enums per aggregate
//! - [`vending`] - broadcast union

pub mod envelope;
pub mod machine;
pub mod purchase;
pub mod snack;
pub mod vending;

pub use envelope::{DomainEvent, ErrorCode, ErrorEvent, EventEnvelope, StreamMessage};
pub use machine::MachineEvent;
pub use purchase::PurchaseEvent;
pub use snack::SnackEvent;
pub use vending::VendingEvent;
