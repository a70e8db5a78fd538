// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event-sourced vending machines with self-healing read models
//!
//! Machine, Snack and Purchase aggregates publish versioned events onto
//! per-key streams. Query rows are kept current incrementally when that is
//! safe and rebuilt from the authoritative aggregates when it is not; a
//! periodic drift scan repairs whatever both paths missed.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod nats;
pub mod projection;
pub mod publisher;
pub mod runtime;
pub mod service;
pub mod stats;
pub mod subjects;
pub mod sync;
pub mod system;

// Re-export commonly used types
pub use aggregate::{Aggregate, CommandContext, Machine, Purchase, Snack};
pub use config::SyncConfig;
pub use errors::{RuntimeError, RuntimeResult};
pub use nats::{NatsClient, NatsConfig};
pub use service::{ServiceError, ServiceResult, VendingService};
pub use system::VendingSystem;
