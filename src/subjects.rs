// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for vending events
//!
//! # Subject Pattern
//!
//! ```text
//! vending.{kind}.{aggregate_id}      per-key stream
//! vending.broadcast.{kind}           broadcast stream
//! vending.projection.{kind}          projection notices
//! vending.projection.error           projection failures
//! ```
//!
//! This allows for:
//! - Precise subscriptions (`vending.machine.0191...`)
//! - Kind-level wildcards (`vending.machine.>`)
//! - Global subscriptions (`vending.>`)
//!
//! # Examples
//!
//! ```rust
//! use vending_sync::domain::AggregateKind;
//! use vending_sync::subjects::SubjectBuilder;
//!
//! let wildcard = SubjectBuilder::new(AggregateKind::Snack).build();
//! assert_eq!(wildcard, "vending.snack.>");
//!
//! let broadcast = SubjectBuilder::new(AggregateKind::Purchase).broadcast().build();
//! assert_eq!(broadcast, "vending.broadcast.purchase");
//! ```

use uuid::Uuid;

use crate::domain::AggregateKind;

/// Root namespace for all vending subjects
pub const VENDING_ROOT: &str = "vending";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Key(Option<Uuid>),
    Broadcast,
    Projection,
}

/// Builder for vending NATS subjects
#[derive(Debug, Clone)]
pub struct SubjectBuilder {
    kind: AggregateKind,
    channel: Channel,
}

impl SubjectBuilder {
    /// Per-key channel of a kind; a wildcard until an id is set
    pub fn new(kind: AggregateKind) -> Self {
        Self {
            kind,
            channel: Channel::Key(None),
        }
    }

    pub fn aggregate_id(mut self, id: Uuid) -> Self {
        self.channel = Channel::Key(Some(id));
        self
    }

    pub fn broadcast(mut self) -> Self {
        self.channel = Channel::Broadcast;
        self
    }

    pub fn projection(mut self) -> Self {
        self.channel = Channel::Projection;
        self
    }

    pub fn build(self) -> String {
        match self.channel {
            Channel::Key(Some(id)) => format!("{}.{}.{}", VENDING_ROOT, self.kind, id),
            Channel::Key(None) => format!("{}.{}.>", VENDING_ROOT, self.kind),
            Channel::Broadcast => format!("{}.broadcast.{}", VENDING_ROOT, self.kind),
            Channel::Projection => format!("{}.projection.{}", VENDING_ROOT, self.kind),
        }
    }

    /// Subject for projection failure notices
    pub fn projection_errors() -> String {
        format!("{}.projection.error", VENDING_ROOT)
    }

    /// Subscription for all vending subjects
    pub fn build_all() -> String {
        format!("{}.>", VENDING_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_subject() {
        let id = Uuid::nil();
        let subject = SubjectBuilder::new(AggregateKind::Machine)
            .aggregate_id(id)
            .build();

        assert_eq!(
            subject,
            "vending.machine.00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_wildcard_subject() {
        assert_eq!(
            SubjectBuilder::new(AggregateKind::Snack).build(),
            "vending.snack.>"
        );
        assert_eq!(SubjectBuilder::build_all(), "vending.>");
    }

    #[test]
    fn test_broadcast_and_projection_subjects() {
        assert_eq!(
            SubjectBuilder::new(AggregateKind::Machine).broadcast().build(),
            "vending.broadcast.machine"
        );
        assert_eq!(
            SubjectBuilder::new(AggregateKind::Snack).projection().build(),
            "vending.projection.snack"
        );
    }
}
