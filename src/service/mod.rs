// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer
//!
//! Application services that turn caller intent into commands against the
//! aggregate hosts.
//!
//! # Architecture
//!
//! ```text
//! Client Request
//!     ↓
//! VendingService (this module)
//!     ↓
//! AggregateHost → Aggregate::handle → Event
//!     ↓
//! State store + per-key stream + broadcast stream
//!     ↓
//! Projections
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let ctx = CommandContext::new("operator", Utc::now());
//! service.initialize_snack(snack_id, "Chips", None, &ctx).await?;
//! service.initialize_machine(machine_id, vec![Slot::empty(1)], Money::ZERO, &ctx).await?;
//! let receipt = service.buy_snack(machine_id, 1, &ctx).await?;
//! ```

pub mod vending;

pub use vending::{Receipt, ServiceError, ServiceResult, VendingService};
