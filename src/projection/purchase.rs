// Copyright (c) 2025 - Cowboy AI, Inc.
//! Purchase projection

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::projector::RowProjection;
use super::reconciler::SnapshotSource;
use super::rows::PurchaseInfo;
use super::{ProjectionError, ProjectionResult, ProjectionRow};
use crate::aggregate::Purchase;
use crate::cache::SnackLookup;
use crate::events::{DomainEvent, EventEnvelope, PurchaseEvent};
use crate::runtime::AggregateHost;

/// Purchase rows denormalize the bought snack's name and picture
pub struct PurchaseProjection {
    snacks: Arc<dyn SnackLookup>,
}

impl PurchaseProjection {
    pub fn new(snacks: Arc<dyn SnackLookup>) -> Self {
        Self { snacks }
    }
}

#[async_trait]
impl RowProjection for PurchaseProjection {
    type Event = PurchaseEvent;
    type Row = PurchaseInfo;

    async fn create(&self, envelope: &EventEnvelope<PurchaseEvent>) -> ProjectionResult<PurchaseInfo> {
        let PurchaseEvent::Initialized {
            machine_id,
            position,
            snack_id,
            bought_price,
        } = &envelope.event;
        let snack = self.snacks.snack(*snack_id).await?;

        Ok(PurchaseInfo {
            id: envelope.aggregate_id,
            version: envelope.version,
            machine_id: *machine_id,
            position: *position,
            snack_id: *snack_id,
            snack_name: snack.name,
            snack_picture_url: snack.picture_url,
            bought_price: *bought_price,
            bought_at: Some(envelope.operated_at),
            bought_by: Some(envelope.operated_by.clone()),
        })
    }

    /// Purchases never change after they are initialized
    async fn apply(
        &self,
        _row: PurchaseInfo,
        envelope: &EventEnvelope<PurchaseEvent>,
    ) -> ProjectionResult<PurchaseInfo> {
        Err(ProjectionError::InvalidEvent {
            kind: PurchaseInfo::KIND,
            id: envelope.aggregate_id,
            event_type: envelope.event_type_name(),
        })
    }

    fn stamp(mut row: PurchaseInfo, version: u64) -> PurchaseInfo {
        row.version = version;
        row
    }
}

pub struct PurchaseSnapshots {
    purchases: Arc<AggregateHost<Purchase>>,
    snacks: Arc<dyn SnackLookup>,
}

impl PurchaseSnapshots {
    pub fn new(purchases: Arc<AggregateHost<Purchase>>, snacks: Arc<dyn SnackLookup>) -> Self {
        Self { purchases, snacks }
    }
}

#[async_trait]
impl SnapshotSource<PurchaseInfo> for PurchaseSnapshots {
    async fn snapshot(&self, id: Uuid) -> ProjectionResult<Option<PurchaseInfo>> {
        let Some(purchase) = self.purchases.find(id).await? else {
            return Ok(None);
        };
        let snack = self.snacks.snack(purchase.snack_id).await?;

        Ok(Some(PurchaseInfo {
            id: purchase.id,
            version: purchase.version,
            machine_id: purchase.machine_id,
            position: purchase.position,
            snack_id: purchase.snack_id,
            snack_name: snack.name,
            snack_picture_url: snack.picture_url,
            bought_price: purchase.bought_price,
            bought_at: purchase.bought_at,
            bought_by: purchase.bought_by,
        }))
    }

    async fn ids(&self) -> ProjectionResult<Vec<Uuid>> {
        Ok(self.purchases.ids().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedSnack;
    use crate::domain::AggregateKind;
    use chrono::Utc;

    struct NoSnacks;

    #[async_trait]
    impl SnackLookup for NoSnacks {
        async fn snack(&self, id: Uuid) -> ProjectionResult<CachedSnack> {
            Err(ProjectionError::MissingDependency {
                kind: AggregateKind::Snack,
                id,
            })
        }
    }

    #[tokio::test]
    async fn test_missing_snack_fails_create() {
        let snack_id = Uuid::now_v7();
        let envelope = EventEnvelope {
            event_id: Uuid::now_v7(),
            aggregate_id: Uuid::now_v7(),
            version: 1,
            trace_id: Uuid::now_v7(),
            operated_at: Utc::now(),
            operated_by: "customer".to_string(),
            event: PurchaseEvent::Initialized {
                machine_id: Uuid::now_v7(),
                position: 1,
                snack_id,
                bought_price: 3,
            },
        };

        let result = PurchaseProjection::new(Arc::new(NoSnacks)).create(&envelope).await;

        assert!(matches!(
            result,
            Err(ProjectionError::MissingDependency { id, .. }) if id == snack_id
        ));
    }
}
