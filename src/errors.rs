// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for runtime operations (event log, state store, messaging)

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in runtime operations
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Event submitted with a version that does not follow the stream head
    #[error("Out-of-order append for {key}: expected version {expected}, got {actual}")]
    OutOfOrder {
        key: Uuid,
        expected: u64,
        actual: u64,
    },

    /// Optimistic version check failed while saving aggregate state
    #[error("Concurrency conflict for {key}: expected version {expected}, stored version {actual}")]
    Concurrency {
        key: Uuid,
        expected: u64,
        actual: u64,
    },

    /// NATS connection error
    #[error("NATS connection error: {0}")]
    NatsConnection(String),

    /// NATS publish error
    #[error("NATS publish error: {0}")]
    NatsPublish(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage I/O error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl From<async_nats::Error> for RuntimeError {
    fn from(err: async_nats::Error) -> Self {
        RuntimeError::NatsConnection(err.to_string())
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        RuntimeError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::Storage(err.to_string())
    }
}
