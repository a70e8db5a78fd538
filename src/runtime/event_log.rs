// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Event Log
//!
//! Append-only log of messages, ordered globally and indexed per aggregate
//! key. Stands in for the hosting runtime's named streams.
//!
//! # Guarantees
//!
//! 1. **Append-Only**: messages are never updated or removed
//! 2. **Per-key order**: a versioned message must carry `head + 1`
//! 3. **Replay**: subscriptions start from any [`ResumeToken`]
//! 4. **At-least-once**: resuming from an old token redelivers
//!
//! ```text
//! append(m) ──→ [ m0 | m1 | m2 | ... ] ──→ Subscription::next() → (Record, ResumeToken)
//!                        │
//!                        └── by key ──→ read_from(key, version)
//! ```

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{RuntimeError, RuntimeResult};
use crate::events::{StreamMessage, VendingEvent};

/// A message that can live in an [`InMemoryEventLog`]
pub trait LogEntry: Clone + Send + Sync + 'static {
    /// Aggregate key the message belongs to
    fn key(&self) -> Uuid;

    /// Version the message advances its key to, if it is versioned
    fn sequence(&self) -> Option<u64>;
}

impl<E: Clone + Send + Sync + 'static> LogEntry for StreamMessage<E> {
    fn key(&self) -> Uuid {
        self.aggregate_id()
    }

    fn sequence(&self) -> Option<u64> {
        StreamMessage::sequence(self)
    }
}

impl LogEntry for VendingEvent {
    fn key(&self) -> Uuid {
        self.aggregate_id()
    }

    // Broadcast order is global; per-key versions were checked upstream.
    fn sequence(&self) -> Option<u64> {
        None
    }
}

/// Position to resume reading from (the next record to deliver)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ResumeToken(pub u64);

impl ResumeToken {
    /// Read from the very first record
    pub const START: ResumeToken = ResumeToken(0);
}

/// A message together with its global position
#[derive(Debug, Clone, PartialEq)]
pub struct Record<M> {
    pub position: u64,
    pub message: M,
}

struct LogInner<M> {
    entries: Vec<M>,
    heads: HashMap<Uuid, u64>,
}

/// Append-only, keyed, subscribable log
pub struct InMemoryEventLog<M> {
    namespace: String,
    inner: Arc<RwLock<LogInner<M>>>,
    appended: Arc<watch::Sender<u64>>,
}

impl<M> Clone for InMemoryEventLog<M> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            inner: Arc::clone(&self.inner),
            appended: Arc::clone(&self.appended),
        }
    }
}

impl<M: LogEntry> InMemoryEventLog<M> {
    pub fn new(namespace: impl Into<String>) -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            namespace: namespace.into(),
            inner: Arc::new(RwLock::new(LogInner {
                entries: Vec::new(),
                heads: HashMap::new(),
            })),
            appended: Arc::new(appended),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Append a message, returning its key's head version afterwards
    ///
    /// # Errors
    ///
    /// `RuntimeError::OutOfOrder` when a versioned message does not carry
    /// exactly `head + 1` (gaps and duplicates are both rejected).
    pub async fn append(&self, message: M) -> RuntimeResult<u64> {
        let key = message.key();
        let mut inner = self.inner.write().await;
        let head = inner.heads.get(&key).copied().unwrap_or(0);

        let head = match message.sequence() {
            Some(version) if version != head + 1 => {
                return Err(RuntimeError::OutOfOrder {
                    key,
                    expected: head + 1,
                    actual: version,
                });
            }
            Some(version) => {
                inner.heads.insert(key, version);
                version
            }
            None => head,
        };

        inner.entries.push(message);
        let len = inner.entries.len() as u64;
        drop(inner);

        self.appended.send_replace(len);
        debug!(
            namespace = %self.namespace,
            aggregate_id = %key,
            head,
            position = len - 1,
            "Appended to log"
        );

        Ok(head)
    }

    /// Last committed version for a key (0 when nothing was committed)
    pub async fn head(&self, key: Uuid) -> u64 {
        self.inner.read().await.heads.get(&key).copied().unwrap_or(0)
    }

    /// Versioned messages of one key, starting at `from_version` (inclusive)
    pub async fn read_from(&self, key: Uuid, from_version: u64) -> Vec<M> {
        self.inner
            .read()
            .await
            .entries
            .iter()
            .filter(|m| m.key() == key && m.sequence().is_some_and(|v| v >= from_version))
            .cloned()
            .collect()
    }

    /// Every message of one key, errors included, in append order
    pub async fn read_key(&self, key: Uuid) -> Vec<M> {
        self.inner
            .read()
            .await
            .entries
            .iter()
            .filter(|m| m.key() == key)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> u64 {
        self.inner.read().await.entries.len() as u64
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Subscribe to every key from a resume token
    pub fn subscribe(&self, from: ResumeToken) -> Subscription<M> {
        self.subscription(from, None)
    }

    /// Subscribe to a single key from a resume token
    pub fn subscribe_key(&self, key: Uuid, from: ResumeToken) -> Subscription<M> {
        self.subscription(from, Some(key))
    }

    fn subscription(&self, from: ResumeToken, key: Option<Uuid>) -> Subscription<M> {
        Subscription {
            inner: Arc::clone(&self.inner),
            appended: self.appended.subscribe(),
            position: from.0,
            key,
        }
    }
}

/// Ordered, resumable reader over an [`InMemoryEventLog`]
///
/// Ends (returns `None`) once every handle to the log is dropped and all
/// records were delivered.
pub struct Subscription<M> {
    inner: Arc<RwLock<LogInner<M>>>,
    appended: watch::Receiver<u64>,
    position: u64,
    key: Option<Uuid>,
}

impl<M: LogEntry> Subscription<M> {
    /// Token that resumes right after the last delivered record
    pub fn token(&self) -> ResumeToken {
        ResumeToken(self.position)
    }

    /// Wait for the next matching record
    pub async fn next(&mut self) -> Option<(Record<M>, ResumeToken)> {
        loop {
            // Mark the current length seen before scanning, so an append
            // racing the scan still wakes `changed()` below.
            self.appended.borrow_and_update();

            if let Some(record) = self.scan().await {
                return Some((record, self.token()));
            }

            if self.appended.changed().await.is_err() {
                // Log dropped; drain what is left, then end.
                return self.scan().await.map(|record| (record, self.token()));
            }
        }
    }

    async fn scan(&mut self) -> Option<Record<M>> {
        let inner = self.inner.read().await;
        let start = usize::try_from(self.position).unwrap_or(usize::MAX);

        for (index, message) in inner.entries.iter().enumerate().skip(start) {
            if self.key.map_or(true, |key| message.key() == key) {
                self.position = index as u64 + 1;
                return Some(Record {
                    position: index as u64,
                    message: message.clone(),
                });
            }
        }

        self.position = self.position.max(inner.entries.len() as u64);
        None
    }

    /// Adapt into a `Stream` of `(record, next token)`
    pub fn into_stream(self) -> impl Stream<Item = (Record<M>, ResumeToken)> + Send {
        stream::unfold(self, |mut subscription| async move {
            subscription
                .next()
                .await
                .map(|item| (item, subscription))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::events::{ErrorCode, ErrorEvent, EventEnvelope};

    fn event(key: Uuid, version: u64) -> StreamMessage<String> {
        StreamMessage::Event(EventEnvelope {
            event_id: Uuid::now_v7(),
            aggregate_id: key,
            version,
            trace_id: Uuid::now_v7(),
            operated_at: Utc::now(),
            operated_by: "tester".to_string(),
            event: format!("event-{}", version),
        })
    }

    fn error(key: Uuid, version: u64) -> StreamMessage<String> {
        StreamMessage::Error(ErrorEvent {
            event_id: Uuid::now_v7(),
            aggregate_id: key,
            version,
            trace_id: Uuid::now_v7(),
            operated_at: Utc::now(),
            operated_by: "tester".to_string(),
            code: ErrorCode::MachineRemove.code(),
            reasons: vec!["rejected".to_string()],
        })
    }

    #[tokio::test]
    async fn test_append_rejects_gaps_and_repeats() {
        let log = InMemoryEventLog::new("machine");
        let key = Uuid::now_v7();

        assert_eq!(log.append(event(key, 1)).await.unwrap(), 1);

        let gap = log.append(event(key, 3)).await;
        assert!(matches!(
            gap,
            Err(RuntimeError::OutOfOrder {
                expected: 2,
                actual: 3,
                ..
            })
        ));

        let repeat = log.append(event(key, 1)).await;
        assert!(matches!(repeat, Err(RuntimeError::OutOfOrder { .. })));

        assert_eq!(log.head(key).await, 1);
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_error_messages_do_not_advance_head() {
        let log = InMemoryEventLog::new("machine");
        let key = Uuid::now_v7();

        log.append(event(key, 1)).await.unwrap();
        log.append(error(key, 1)).await.unwrap();
        log.append(event(key, 2)).await.unwrap();

        assert_eq!(log.head(key).await, 2);
        assert_eq!(log.read_from(key, 2).await.len(), 1);
        assert_eq!(log.read_key(key).await.len(), 3);
    }

    #[tokio::test]
    async fn test_subscribe_resumes_from_token() {
        // Arrange
        let log = InMemoryEventLog::new("machine");
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        log.append(event(a, 1)).await.unwrap();
        log.append(event(b, 1)).await.unwrap();
        log.append(event(a, 2)).await.unwrap();

        // Act
        let mut all = log.subscribe(ResumeToken::START);
        let (_, token) = all.next().await.unwrap();
        let mut resumed = log.subscribe(token);
        let (second, _) = resumed.next().await.unwrap();

        let mut only_a = log.subscribe_key(a, ResumeToken::START);
        let (_, _) = only_a.next().await.unwrap();
        let (a2, _) = only_a.next().await.unwrap();

        // Assert
        assert_eq!(second.position, 1);
        assert_eq!(second.message.aggregate_id(), b);
        assert_eq!(a2.message.sequence(), Some(2));
    }

    #[tokio::test]
    async fn test_subscription_wakes_on_append() {
        let log = InMemoryEventLog::new("machine");
        let key = Uuid::now_v7();
        let mut subscription = log.subscribe(ResumeToken::START);

        let writer = log.clone();
        let handle = tokio::spawn(async move {
            writer.append(event(key, 1)).await.unwrap();
        });

        let (record, token) = subscription.next().await.unwrap();
        handle.await.unwrap();

        assert_eq!(record.position, 0);
        assert_eq!(token, ResumeToken(1));
    }
}
