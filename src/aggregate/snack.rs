// Copyright (c) 2025 - Cowboy AI, Inc.
//! Snack Aggregate
//!
//! A catalog entry. Machines reference snacks by id in their slots; the
//! snack itself only knows its name and picture.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::SnackCommand;
use super::{Aggregate, CommandContext};
use crate::domain::invariants::{
    validate_live, validate_not_created, validate_operator, validate_snack_name,
};
use crate::domain::{AggregateKind, ValidationReport};
use crate::events::{ErrorCode, EventEnvelope, SnackEvent};

/// Snack State
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snack {
    pub id: Uuid,
    pub version: u64,
    pub is_created: bool,
    pub is_deleted: bool,

    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,

    pub name: String,
    pub picture_url: Option<String>,
}

impl Aggregate for Snack {
    const KIND: AggregateKind = AggregateKind::Snack;

    type Command = SnackCommand;
    type Event = SnackEvent;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            is_created: false,
            is_deleted: false,
            created_at: None,
            created_by: None,
            last_modified_at: None,
            last_modified_by: None,
            deleted_at: None,
            deleted_by: None,
            name: String::new(),
            picture_url: None,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn is_created(&self) -> bool {
        self.is_created
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn error_code(command: &SnackCommand) -> ErrorCode {
        match command {
            SnackCommand::Initialize { .. } => ErrorCode::SnackInitialize,
            SnackCommand::Remove => ErrorCode::SnackRemove,
            SnackCommand::ChangeName { .. } => ErrorCode::SnackChangeName,
            SnackCommand::ChangePictureUrl { .. } => ErrorCode::SnackChangePictureUrl,
        }
    }

    fn validate(&self, command: &SnackCommand, ctx: &CommandContext) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.check(validate_operator(&ctx.operated_by));

        match command {
            SnackCommand::Initialize { name, .. } => {
                report
                    .check(validate_not_created(Self::KIND, self.id, self.is_created))
                    .check(validate_snack_name(name));
            }
            SnackCommand::Remove | SnackCommand::ChangePictureUrl { .. } => {
                validate_live(&mut report, Self::KIND, self.id, self.is_created, self.is_deleted);
            }
            SnackCommand::ChangeName { name } => {
                validate_live(&mut report, Self::KIND, self.id, self.is_created, self.is_deleted);
                report.check(validate_snack_name(name));
            }
        }

        report
    }

    fn handle(
        &self,
        command: SnackCommand,
        ctx: &CommandContext,
    ) -> Result<SnackEvent, ValidationReport> {
        self.validate(&command, ctx).into_result()?;

        Ok(match command {
            SnackCommand::Initialize { name, picture_url } => {
                SnackEvent::Initialized { name, picture_url }
            }
            SnackCommand::Remove => SnackEvent::Removed,
            SnackCommand::ChangeName { name } => SnackEvent::NameChanged { name },
            SnackCommand::ChangePictureUrl { picture_url } => {
                SnackEvent::PictureUrlChanged { picture_url }
            }
        })
    }

    fn apply(self, envelope: &EventEnvelope<SnackEvent>) -> Self {
        let mut next = Snack {
            version: envelope.version,
            last_modified_at: Some(envelope.operated_at),
            last_modified_by: Some(envelope.operated_by.clone()),
            ..self
        };

        match &envelope.event {
            SnackEvent::Initialized { name, picture_url } => {
                next.is_created = true;
                next.created_at = Some(envelope.operated_at);
                next.created_by = Some(envelope.operated_by.clone());
                next.name = name.clone();
                next.picture_url = picture_url.clone();
            }
            SnackEvent::Removed => {
                next.is_deleted = true;
                next.deleted_at = Some(envelope.operated_at);
                next.deleted_by = Some(envelope.operated_by.clone());
            }
            SnackEvent::NameChanged { name } => next.name = name.clone(),
            SnackEvent::PictureUrlChanged { picture_url } => next.picture_url = picture_url.clone(),
        }

        next
    }
}
