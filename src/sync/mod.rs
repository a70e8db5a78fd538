// Copyright (c) 2025 - Cowboy AI, Inc.
//! Drift repair
//!
//! Periodic scans that bring projection stores back in line with their
//! source aggregates, driven by durable reminders.

pub mod reminder;
pub mod synchronizer;

pub use reminder::{
    FileReminderRegistry, InMemoryReminderRegistry, Reminder, ReminderError, ReminderRegistry,
    ReminderResult, ReminderScheduler, ReminderTarget, SyncKind, SyncReminders,
};
pub use synchronizer::{Resync, SyncReport, Synchronizer};
