// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS client and event mirror
//!
//! When a NATS URL is configured, committed events and error events are
//! mirrored onto NATS subjects (see [`crate::subjects`]) next to the
//! in-memory streams.

use async_nats::{Client, ConnectOptions, Subscriber};
use async_trait::async_trait;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, info};

use crate::aggregate::Aggregate;
use crate::errors::{RuntimeError, RuntimeResult};
use crate::events::{ErrorEvent, EventEnvelope, StreamMessage};
use crate::projection::{NoticeSink, ProjectionNotice};
use crate::publisher::EventPublisher;
use crate::subjects::SubjectBuilder;

/// Configuration for NATS connection
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "vending-sync".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// NATS client wrapper
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Create a new NATS client with the given configuration
    pub async fn new(config: NatsConfig) -> RuntimeResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout);

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| RuntimeError::NatsConnection(e.to_string()))?;

        info!("Connected to NATS at {:?}", config.servers);

        Ok(Self { client })
    }

    /// Publish a JSON message to a subject
    pub async fn publish<T>(&self, subject: &str, message: &T) -> RuntimeResult<()>
    where
        T: Serialize,
    {
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| RuntimeError::NatsPublish(e.to_string()))?;

        debug!(subject, "Published message");
        Ok(())
    }

    pub async fn subscribe(&self, subject: &str) -> RuntimeResult<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| RuntimeError::NatsConnection(e.to_string()))?;

        info!(subject, "Subscribed");
        Ok(subscriber)
    }
}

/// Mirrors one aggregate kind's messages onto NATS
pub struct NatsEventPublisher<A> {
    client: NatsClient,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> NatsEventPublisher<A> {
    pub fn new(client: NatsClient) -> Self {
        Self {
            client,
            _aggregate: PhantomData,
        }
    }
}

#[async_trait]
impl<A: Aggregate> EventPublisher<A> for NatsEventPublisher<A> {
    async fn publish_event(&self, envelope: &EventEnvelope<A::Event>) -> RuntimeResult<()> {
        let subject = SubjectBuilder::new(A::KIND)
            .aggregate_id(envelope.aggregate_id)
            .build();
        self.client
            .publish(&subject, &StreamMessage::Event(envelope.clone()))
            .await?;

        if let Some(broadcast) = A::broadcast(envelope) {
            let subject = SubjectBuilder::new(A::KIND).broadcast().build();
            self.client.publish(&subject, &broadcast).await?;
        }

        Ok(())
    }

    async fn publish_error(&self, error: &ErrorEvent) -> RuntimeResult<()> {
        let subject = SubjectBuilder::new(A::KIND)
            .aggregate_id(error.aggregate_id)
            .build();
        self.client
            .publish(&subject, &StreamMessage::<A::Event>::Error(error.clone()))
            .await
    }
}

/// Mirrors projection notices onto `vending.projection.*`
pub struct NatsNoticeSink {
    client: NatsClient,
}

impl NatsNoticeSink {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NoticeSink for NatsNoticeSink {
    async fn notify(&self, notice: ProjectionNotice) -> RuntimeResult<()> {
        let subject = match notice.kind() {
            Some(kind) => SubjectBuilder::new(kind).projection().build(),
            None => SubjectBuilder::projection_errors(),
        };
        self.client.publish(&subject, &notice).await
    }
}
