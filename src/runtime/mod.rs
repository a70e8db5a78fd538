// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hosting runtime primitives
//!
//! The narrow surface the vending core needs from an actor platform:
//!
//! - [`event_log`] - append to a named, keyed stream; subscribe with a resume token
//! - [`state_store`] - durable per-unit state
//! - [`host`] - get or create an addressable unit by key, one writer per key

pub mod event_log;
pub mod host;
pub mod state_store;

pub use event_log::{InMemoryEventLog, LogEntry, Record, ResumeToken, Subscription};
pub use host::{AggregateHost, ExecuteError};
pub use state_store::{InMemoryStateStore, StateStore};
