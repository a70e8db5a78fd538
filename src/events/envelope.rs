// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Envelopes
//!
//! Every committed domain event travels inside an [`EventEnvelope`] that
//! carries the aggregate identity, the version the event produced, the
//! trace id of the triggering command, a timestamp and the operator.
//!
//! Rejected commands produce an [`ErrorEvent`] instead. Both share one
//! channel type, [`StreamMessage`], so subscribers can branch on the
//! variant without looking inside the payload.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Behaviour shared by the closed per-aggregate event enums
pub trait DomainEvent:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Human-readable event type name
    fn event_type_name(&self) -> &'static str;

    /// True for the event that brings an aggregate into existence
    fn is_initializing(&self) -> bool;
}

/// Stable numeric codes for rejected commands and projection failures
///
/// External consumers branch on these, never on reason strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    SnackInitialize = 101,
    SnackRemove = 102,
    SnackChangeName = 103,
    SnackChangePictureUrl = 104,

    MachineInitialize = 201,
    MachineRemove = 202,
    MachineAddSlot = 203,
    MachineRemoveSlot = 204,
    MachineLoadMoney = 205,
    MachineUnloadMoney = 206,
    MachineInsertMoney = 207,
    MachineReturnMoney = 208,
    MachineLoadSnacks = 209,
    MachineUnloadSnacks = 210,
    MachineBuySnack = 211,

    PurchaseInitialize = 301,

    ProjectionApply = 901,
    ProjectionRebuild = 902,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        use ErrorCode::*;

        let known = [
            SnackInitialize,
            SnackRemove,
            SnackChangeName,
            SnackChangePictureUrl,
            MachineInitialize,
            MachineRemove,
            MachineAddSlot,
            MachineRemoveSlot,
            MachineLoadMoney,
            MachineUnloadMoney,
            MachineInsertMoney,
            MachineReturnMoney,
            MachineLoadSnacks,
            MachineUnloadSnacks,
            MachineBuySnack,
            PurchaseInitialize,
            ProjectionApply,
            ProjectionRebuild,
        ];
        known.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Immutable record of one committed state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    /// Unique event identifier (UUID v7 for time ordering)
    pub event_id: Uuid,

    /// Aggregate that produced the event
    pub aggregate_id: Uuid,

    /// Version the aggregate reached with this event (1-based)
    pub version: u64,

    /// Correlates the event with the command that caused it
    pub trace_id: Uuid,

    /// When the command was operated
    pub operated_at: DateTime<Utc>,

    /// Who or what operated the command
    pub operated_by: String,

    /// The event payload
    pub event: E,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn event_type_name(&self) -> &'static str {
        self.event.event_type_name()
    }
}

/// A rejected command, or a projection failure on the notice stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,

    /// Aggregate version at the time of the failure (unchanged by it)
    pub version: u64,

    pub trace_id: Uuid,
    pub operated_at: DateTime<Utc>,
    pub operated_by: String,

    /// Stable numeric code, see [`ErrorCode`]
    pub code: u16,

    /// Human-readable failure reasons
    pub reasons: Vec<String>,
}

impl ErrorEvent {
    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

/// What travels on a per-key aggregate stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum StreamMessage<E> {
    Event(EventEnvelope<E>),
    Error(ErrorEvent),
}

impl<E> StreamMessage<E> {
    pub fn aggregate_id(&self) -> Uuid {
        match self {
            StreamMessage::Event(envelope) => envelope.aggregate_id,
            StreamMessage::Error(error) => error.aggregate_id,
        }
    }

    /// Version this message advances the stream to; errors advance nothing
    pub fn sequence(&self) -> Option<u64> {
        match self {
            StreamMessage::Event(envelope) => Some(envelope.version),
            StreamMessage::Error(_) => None,
        }
    }
}
