// Copyright (c) 2025 - Cowboy AI, Inc.
//! Snack projection
//!
//! Deltas carry name, picture and lifecycle. Stock and sales counters come
//! from machines and purchases, so only a rebuild refreshes them.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::projector::RowProjection;
use super::reconciler::SnapshotSource;
use super::rows::SnackInfo;
use super::{ProjectionError, ProjectionResult, ProjectionRow};
use crate::aggregate::Snack;
use crate::events::{DomainEvent, EventEnvelope, SnackEvent};
use crate::runtime::AggregateHost;
use crate::stats::StatsSource;

#[derive(Debug, Clone, Copy, Default)]
pub struct SnackProjection;

#[async_trait]
impl RowProjection for SnackProjection {
    type Event = SnackEvent;
    type Row = SnackInfo;

    async fn create(&self, envelope: &EventEnvelope<SnackEvent>) -> ProjectionResult<SnackInfo> {
        let SnackEvent::Initialized { name, picture_url } = &envelope.event else {
            return Err(ProjectionError::InvalidEvent {
                kind: SnackInfo::KIND,
                id: envelope.aggregate_id,
                event_type: envelope.event_type_name(),
            });
        };

        Ok(SnackInfo {
            id: envelope.aggregate_id,
            version: envelope.version,
            name: name.clone(),
            picture_url: picture_url.clone(),
            machine_count: 0,
            total_quantity: 0,
            total_amount: 0,
            bought_count: 0,
            bought_amount: 0,
            created_at: Some(envelope.operated_at),
            created_by: Some(envelope.operated_by.clone()),
            last_modified_at: Some(envelope.operated_at),
            last_modified_by: Some(envelope.operated_by.clone()),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        })
    }

    async fn apply(
        &self,
        mut row: SnackInfo,
        envelope: &EventEnvelope<SnackEvent>,
    ) -> ProjectionResult<SnackInfo> {
        match &envelope.event {
            SnackEvent::Initialized { .. } => {
                return Err(ProjectionError::InvalidEvent {
                    kind: SnackInfo::KIND,
                    id: envelope.aggregate_id,
                    event_type: envelope.event_type_name(),
                })
            }
            SnackEvent::Removed => {
                row.is_deleted = true;
                row.deleted_at = Some(envelope.operated_at);
                row.deleted_by = Some(envelope.operated_by.clone());
            }
            SnackEvent::NameChanged { name } => row.name = name.clone(),
            SnackEvent::PictureUrlChanged { picture_url } => row.picture_url = picture_url.clone(),
        }

        row.last_modified_at = Some(envelope.operated_at);
        row.last_modified_by = Some(envelope.operated_by.clone());
        Ok(row)
    }

    fn stamp(mut row: SnackInfo, version: u64) -> SnackInfo {
        row.version = version;
        row
    }
}

/// Snack snapshots with stock across live machines and sales
pub struct SnackSnapshots {
    snacks: Arc<AggregateHost<Snack>>,
    stats: Arc<dyn StatsSource>,
}

impl SnackSnapshots {
    pub fn new(snacks: Arc<AggregateHost<Snack>>, stats: Arc<dyn StatsSource>) -> Self {
        Self { snacks, stats }
    }
}

#[async_trait]
impl SnapshotSource<SnackInfo> for SnackSnapshots {
    async fn snapshot(&self, id: Uuid) -> ProjectionResult<Option<SnackInfo>> {
        let Some(snack) = self.snacks.find(id).await? else {
            return Ok(None);
        };
        let stock = self.stats.snack_stock(id).await?;
        let sales = self.stats.snack_sales(id).await?;

        Ok(Some(SnackInfo {
            id: snack.id,
            version: snack.version,
            name: snack.name,
            picture_url: snack.picture_url,
            machine_count: stock.machine_count,
            total_quantity: stock.total_quantity,
            total_amount: stock.total_amount,
            bought_count: sales.count,
            bought_amount: sales.amount,
            created_at: snack.created_at,
            created_by: snack.created_by,
            last_modified_at: snack.last_modified_at,
            last_modified_by: snack.last_modified_by,
            is_deleted: snack.is_deleted,
            deleted_at: snack.deleted_at,
            deleted_by: snack.deleted_by,
        }))
    }

    async fn ids(&self) -> ProjectionResult<Vec<Uuid>> {
        Ok(self.snacks.ids().await?)
    }
}
