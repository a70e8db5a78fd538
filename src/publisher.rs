// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Publisher
//!
//! Delivers committed events to the per-key stream of their aggregate kind
//! and, for kinds with a broadcast form, to the broadcast stream.
//!
//! Delivery is triggering only: the state change is already committed when
//! a publisher runs, so callers log publish failures and move on.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::aggregate::Aggregate;
use crate::errors::RuntimeResult;
use crate::events::{ErrorEvent, EventEnvelope, StreamMessage, VendingEvent};
use crate::runtime::InMemoryEventLog;

/// Publishes one aggregate kind's events and error events
#[async_trait]
pub trait EventPublisher<A: Aggregate>: Send + Sync {
    /// Publish a committed event
    async fn publish_event(&self, envelope: &EventEnvelope<A::Event>) -> RuntimeResult<()>;

    /// Publish a rejected command
    async fn publish_error(&self, error: &ErrorEvent) -> RuntimeResult<()>;
}

/// Publisher onto the in-memory logs
pub struct LogPublisher<A: Aggregate> {
    stream: InMemoryEventLog<StreamMessage<A::Event>>,
    broadcast: InMemoryEventLog<VendingEvent>,
}

impl<A: Aggregate> LogPublisher<A> {
    pub fn new(
        stream: InMemoryEventLog<StreamMessage<A::Event>>,
        broadcast: InMemoryEventLog<VendingEvent>,
    ) -> Self {
        Self { stream, broadcast }
    }
}

#[async_trait]
impl<A: Aggregate> EventPublisher<A> for LogPublisher<A> {
    async fn publish_event(&self, envelope: &EventEnvelope<A::Event>) -> RuntimeResult<()> {
        self.stream
            .append(StreamMessage::Event(envelope.clone()))
            .await?;

        if let Some(event) = A::broadcast(envelope) {
            self.broadcast.append(event).await?;
        }

        Ok(())
    }

    async fn publish_error(&self, error: &ErrorEvent) -> RuntimeResult<()> {
        self.stream.append(StreamMessage::Error(error.clone())).await?;
        Ok(())
    }
}

/// Primary publisher plus best-effort mirrors
///
/// The primary's result is returned; mirror failures are logged only.
pub struct MirroredPublisher<A> {
    primary: Arc<dyn EventPublisher<A>>,
    mirrors: Vec<Arc<dyn EventPublisher<A>>>,
}

impl<A: Aggregate> MirroredPublisher<A> {
    pub fn new(primary: Arc<dyn EventPublisher<A>>) -> Self {
        Self {
            primary,
            mirrors: Vec::new(),
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn EventPublisher<A>>) -> Self {
        self.mirrors.push(mirror);
        self
    }
}

#[async_trait]
impl<A: Aggregate> EventPublisher<A> for MirroredPublisher<A> {
    async fn publish_event(&self, envelope: &EventEnvelope<A::Event>) -> RuntimeResult<()> {
        let result = self.primary.publish_event(envelope).await;

        for mirror in &self.mirrors {
            if let Err(e) = mirror.publish_event(envelope).await {
                warn!(
                    aggregate_id = %envelope.aggregate_id,
                    version = envelope.version,
                    error = %e,
                    "Mirror publish failed"
                );
            }
        }

        result
    }

    async fn publish_error(&self, error: &ErrorEvent) -> RuntimeResult<()> {
        let result = self.primary.publish_error(error).await;

        for mirror in &self.mirrors {
            if let Err(e) = mirror.publish_error(error).await {
                warn!(aggregate_id = %error.aggregate_id, error = %e, "Mirror publish failed");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::aggregate::{Machine, Snack};
    use crate::domain::Money;
    use crate::events::{MachineEvent, SnackEvent};
    use crate::runtime::ResumeToken;

    fn envelope<E>(version: u64, event: E) -> EventEnvelope<E> {
        EventEnvelope {
            event_id: Uuid::now_v7(),
            aggregate_id: Uuid::nil(),
            version,
            trace_id: Uuid::now_v7(),
            operated_at: Utc::now(),
            operated_by: "tester".to_string(),
            event,
        }
    }

    #[tokio::test]
    async fn test_machine_events_are_broadcast() {
        let stream = InMemoryEventLog::new("machine");
        let broadcast = InMemoryEventLog::new("broadcast");
        let publisher = LogPublisher::<Machine>::new(stream.clone(), broadcast.clone());

        publisher
            .publish_event(&envelope(
                1,
                MachineEvent::Initialized {
                    slots: Vec::new(),
                    money_inside: Money::ZERO,
                },
            ))
            .await
            .unwrap();

        assert_eq!(stream.len().await, 1);
        let (record, _) = broadcast.subscribe(ResumeToken::START).next().await.unwrap();
        assert_eq!(record.message.event_type_name(), "MachineInitialized");
    }

    #[tokio::test]
    async fn test_snack_events_stay_on_their_stream() {
        let stream = InMemoryEventLog::new("snack");
        let broadcast = InMemoryEventLog::new("broadcast");
        let publisher = LogPublisher::<Snack>::new(stream.clone(), broadcast.clone());

        publisher
            .publish_event(&envelope(
                1,
                SnackEvent::Initialized {
                    name: "Chips".to_string(),
                    picture_url: None,
                },
            ))
            .await
            .unwrap();

        assert_eq!(stream.len().await, 1);
        assert!(broadcast.is_empty().await);
    }
}
