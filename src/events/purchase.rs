// Copyright (c) 2025 - Cowboy AI, Inc.
//! Purchase Domain Events

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::DomainEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PurchaseEvent {
    /// A snack was sold; the purchase records what, where and for how much
    Initialized {
        machine_id: Uuid,
        position: u32,
        snack_id: Uuid,
        bought_price: u64,
    },
}

impl DomainEvent for PurchaseEvent {
    fn event_type_name(&self) -> &'static str {
        match self {
            PurchaseEvent::Initialized { .. } => "PurchaseInitialized",
        }
    }

    fn is_initializing(&self) -> bool {
        matches!(self, PurchaseEvent::Initialized { .. })
    }
}
