// Copyright (c) 2025 - Cowboy AI, Inc.
//! Snack Domain Events

use serde::{Deserialize, Serialize};

use super::envelope::DomainEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnackEvent {
    Initialized {
        name: String,
        picture_url: Option<String>,
    },
    Removed,
    NameChanged {
        name: String,
    },
    PictureUrlChanged {
        picture_url: Option<String>,
    },
}

impl DomainEvent for SnackEvent {
    fn event_type_name(&self) -> &'static str {
        match self {
            SnackEvent::Initialized { .. } => "SnackInitialized",
            SnackEvent::Removed => "SnackRemoved",
            SnackEvent::NameChanged { .. } => "SnackNameChanged",
            SnackEvent::PictureUrlChanged { .. } => "SnackPictureUrlChanged",
        }
    }

    fn is_initializing(&self) -> bool {
        matches!(self, SnackEvent::Initialized { .. })
    }
}
