// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for vending-sync
//!
//! Deterministic ids, timestamps and command contexts, plus helpers to
//! build a running system and wait for its projections to settle.
//!
//! # Design Principles
//! - Ids and timestamps are fixed constants so failures are reproducible
//! - Fixtures build events and contexts; tests describe behaviour
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use vending_sync::domain::{Slot, SnackPile};
use vending_sync::events::{EventEnvelope, MachineEvent};
use vending_sync::projection::RetryPolicy;
use vending_sync::{CommandContext, SyncConfig, VendingSystem};

pub const MACHINE_ID_1: &str = "01934f4a-1000-7000-8000-000000001000";
pub const MACHINE_ID_2: &str = "01934f4a-1001-7000-8000-000000001001";
pub const SNACK_ID_1: &str = "01934f4a-2000-7000-8000-000000002000";
pub const SNACK_ID_2: &str = "01934f4a-2001-7000-8000-000000002001";
pub const TRACE_ID_1: &str = "01934f4a-c001-7000-8000-00000000c001";

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

pub const OPERATOR: &str = "operator@example.com";

/// Parse a fixed UUID from a constant string
pub fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("Invalid UUID in test fixture")
}

pub fn machine_id() -> Uuid {
    parse_uuid(MACHINE_ID_1)
}

pub fn other_machine_id() -> Uuid {
    parse_uuid(MACHINE_ID_2)
}

pub fn snack_id() -> Uuid {
    parse_uuid(SNACK_ID_1)
}

pub fn other_snack_id() -> Uuid {
    parse_uuid(SNACK_ID_2)
}

/// Parse the fixed timestamp
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// Command context with fixed time, operator and trace id
pub fn ctx() -> CommandContext {
    CommandContext::new(OPERATOR, fixed_timestamp()).with_trace_id(parse_uuid(TRACE_ID_1))
}

pub fn pile(snack_id: Uuid, quantity: u32, price: u64) -> SnackPile {
    SnackPile {
        snack_id,
        quantity,
        price,
    }
}

pub fn stocked_slot(position: u32, pile: SnackPile) -> Slot {
    Slot {
        position,
        snack_pile: Some(pile),
    }
}

/// Envelope for a machine event at an explicit version
pub fn machine_envelope(id: Uuid, version: u64, event: MachineEvent) -> EventEnvelope<MachineEvent> {
    EventEnvelope {
        event_id: Uuid::now_v7(),
        aggregate_id: id,
        version,
        trace_id: parse_uuid(TRACE_ID_1),
        operated_at: fixed_timestamp(),
        operated_by: OPERATOR.to_string(),
        event,
    }
}

/// Fast retries, two shards, drift scans far in the future
pub fn test_config() -> SyncConfig {
    SyncConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            delay_unit: Duration::from_millis(5),
        },
        differences_due: Duration::from_secs(3600),
        differences_period: Duration::from_secs(3600),
        full_due: Duration::from_secs(3600),
        full_period: Duration::from_secs(3600),
        max_concurrency: 4,
        shards: 2,
        cache_capacity: 64,
        reminder_file: None,
        nats_url: None,
    }
}

/// Built and started system without NATS
pub async fn running_system() -> VendingSystem {
    let system = VendingSystem::build(test_config())
        .await
        .expect("system builds without NATS");
    system.start().await.expect("system starts");
    system
}

/// Poll `check` until it holds or five seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
