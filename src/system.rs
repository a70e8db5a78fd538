// Copyright (c) 2025 - Cowboy AI, Inc.
//! Vending System
//!
//! Wires the write side, the channels and the read side together.
//!
//! ```text
//!                   ┌──────────── VendingService ────────────┐
//!                   ↓                  ↓                      ↓
//!          AggregateHost<Machine>  AggregateHost<Snack>  AggregateHost<Purchase>
//!                   │                  │                      │
//!       per-key streams (machine / snack / purchase) + broadcast stream
//!                   │                                         │
//!       sharded IncrementalProjectors              broadcast listener
//!                   │                                         │
//!                   └──────→ Reconcilers ←──── Synchronizers ←┘── reminders
//!                                  │
//!                      projection stores + notice stream → snack cache
//! ```

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::aggregate::{Aggregate, Machine, Purchase, Snack};
use crate::cache::{CachedSnackLookup, SnackInfoCache, SnackLookup};
use crate::config::SyncConfig;
use crate::errors::RuntimeResult;
use crate::events::{MachineEvent, PurchaseEvent, SnackEvent, StreamMessage, VendingEvent};
use crate::nats::{NatsClient, NatsConfig, NatsEventPublisher, NatsNoticeSink};
use crate::projection::{
    spawn_broadcast_listener, spawn_cache_listener, spawn_projector, IncrementalProjector,
    InMemoryProjectionStore, LogNoticeSink, MachineInfo, MachineProjection, MachineSnapshots,
    MirroredNoticeSink, NoticeSink, ProjectionNotice, ProjectionResult, PurchaseInfo,
    PurchaseProjection, PurchaseSnapshots, RebuildOutcome, Reconciler, RunnerHandle, SnackInfo,
    SnackProjection, SnackSnapshots,
};
use crate::publisher::{EventPublisher, LogPublisher, MirroredPublisher};
use crate::runtime::{AggregateHost, InMemoryEventLog, InMemoryStateStore, ResumeToken};
use crate::service::VendingService;
use crate::stats::{HostStats, StatsSource};
use crate::sync::{
    FileReminderRegistry, InMemoryReminderRegistry, ReminderRegistry, ReminderResult,
    ReminderScheduler, Resync, SyncReminders, SyncReport, Synchronizer,
};

pub const MACHINE_PROJECTION: &str = "machine-info";
pub const SNACK_PROJECTION: &str = "snack-info";
pub const PURCHASE_PROJECTION: &str = "purchase-info";

/// In-memory channels
#[derive(Clone)]
pub struct Channels {
    pub machines: InMemoryEventLog<StreamMessage<MachineEvent>>,
    pub snacks: InMemoryEventLog<StreamMessage<SnackEvent>>,
    pub purchases: InMemoryEventLog<StreamMessage<PurchaseEvent>>,
    pub broadcast: InMemoryEventLog<VendingEvent>,
    pub notices: InMemoryEventLog<ProjectionNotice>,
}

impl Channels {
    fn new() -> Self {
        Self {
            machines: InMemoryEventLog::new("machine"),
            snacks: InMemoryEventLog::new("snack"),
            purchases: InMemoryEventLog::new("purchase"),
            broadcast: InMemoryEventLog::new("broadcast"),
            notices: InMemoryEventLog::new("projection"),
        }
    }
}

/// Projection stores
#[derive(Clone)]
pub struct Stores {
    pub machines: Arc<InMemoryProjectionStore<MachineInfo>>,
    pub snacks: Arc<InMemoryProjectionStore<SnackInfo>>,
    pub purchases: Arc<InMemoryProjectionStore<PurchaseInfo>>,
}

pub struct VendingSystem {
    config: SyncConfig,
    service: Arc<VendingService>,
    channels: Channels,
    stores: Stores,
    cache: Arc<SnackInfoCache>,

    machine_projector: Arc<IncrementalProjector<MachineProjection>>,
    snack_projector: Arc<IncrementalProjector<SnackProjection>>,
    purchase_projector: Arc<IncrementalProjector<PurchaseProjection>>,
    machine_reconciler: Arc<Reconciler<MachineInfo>>,
    snack_reconciler: Arc<Reconciler<SnackInfo>>,

    synchronizers: Vec<Arc<dyn Resync>>,
    reminders: Arc<SyncReminders>,
    scheduler: ReminderScheduler,
    runners: Mutex<Vec<RunnerHandle>>,
}

fn publisher<A: Aggregate>(
    stream: &InMemoryEventLog<StreamMessage<A::Event>>,
    broadcast: &InMemoryEventLog<VendingEvent>,
    nats: Option<&NatsClient>,
) -> Arc<dyn EventPublisher<A>> {
    let primary: Arc<dyn EventPublisher<A>> =
        Arc::new(LogPublisher::<A>::new(stream.clone(), broadcast.clone()));
    match nats {
        Some(client) => Arc::new(
            MirroredPublisher::new(primary).with_mirror(Arc::new(NatsEventPublisher::<A>::new(client.clone()))),
        ),
        None => primary,
    }
}

impl VendingSystem {
    /// Build every component; nothing runs until [`VendingSystem::start`]
    ///
    /// # Errors
    ///
    /// `RuntimeError::NatsConnection` if a NATS URL is configured but
    /// unreachable
    pub async fn build(config: SyncConfig) -> RuntimeResult<Self> {
        let nats = match &config.nats_url {
            Some(url) => Some(
                NatsClient::new(NatsConfig {
                    servers: vec![url.clone()],
                    ..NatsConfig::default()
                })
                .await?,
            ),
            None => None,
        };
        Ok(Self::assemble(config, nats))
    }

    fn assemble(config: SyncConfig, nats: Option<NatsClient>) -> Self {
        let channels = Channels::new();

        let machines = Arc::new(AggregateHost::new(
            Arc::new(InMemoryStateStore::<Machine>::new()),
            publisher::<Machine>(&channels.machines, &channels.broadcast, nats.as_ref()),
        ));
        let snacks = Arc::new(AggregateHost::new(
            Arc::new(InMemoryStateStore::<Snack>::new()),
            publisher::<Snack>(&channels.snacks, &channels.broadcast, nats.as_ref()),
        ));
        let purchases = Arc::new(AggregateHost::new(
            Arc::new(InMemoryStateStore::<Purchase>::new()),
            publisher::<Purchase>(&channels.purchases, &channels.broadcast, nats.as_ref()),
        ));

        let log_sink: Arc<dyn NoticeSink> = Arc::new(LogNoticeSink::new(channels.notices.clone()));
        let notices: Arc<dyn NoticeSink> = match &nats {
            Some(client) => Arc::new(
                MirroredNoticeSink::new(log_sink).with_mirror(Arc::new(NatsNoticeSink::new(client.clone()))),
            ),
            None => log_sink,
        };

        let stores = Stores {
            machines: Arc::new(InMemoryProjectionStore::new()),
            snacks: Arc::new(InMemoryProjectionStore::new()),
            purchases: Arc::new(InMemoryProjectionStore::new()),
        };
        let cache = Arc::new(SnackInfoCache::new(config.cache_capacity));
        let stats: Arc<dyn StatsSource> = Arc::new(HostStats::new(machines.clone(), purchases.clone()));
        let lookup: Arc<dyn SnackLookup> = Arc::new(CachedSnackLookup::new(cache.clone(), snacks.clone()));

        let machine_reconciler = Arc::new(Reconciler::<MachineInfo>::new(
            Arc::new(MachineSnapshots::new(machines.clone(), stats.clone())),
            stores.machines.clone(),
            notices.clone(),
            config.retry,
        ));
        let snack_reconciler = Arc::new(Reconciler::<SnackInfo>::new(
            Arc::new(SnackSnapshots::new(snacks.clone(), stats)),
            stores.snacks.clone(),
            notices.clone(),
            config.retry,
        ));
        let purchase_reconciler = Arc::new(Reconciler::<PurchaseInfo>::new(
            Arc::new(PurchaseSnapshots::new(purchases.clone(), lookup.clone())),
            stores.purchases.clone(),
            notices.clone(),
            config.retry,
        ));

        let machine_projector = Arc::new(IncrementalProjector::new(
            MachineProjection,
            stores.machines.clone(),
            machine_reconciler.clone(),
            notices.clone(),
        ));
        let snack_projector = Arc::new(IncrementalProjector::new(
            SnackProjection,
            stores.snacks.clone(),
            snack_reconciler.clone(),
            notices.clone(),
        ));
        let purchase_projector = Arc::new(IncrementalProjector::new(
            PurchaseProjection::new(lookup),
            stores.purchases.clone(),
            purchase_reconciler.clone(),
            notices,
        ));

        let synchronizers: Vec<Arc<dyn Resync>> = vec![
            Arc::new(Synchronizer::new(
                MACHINE_PROJECTION,
                machine_reconciler.clone(),
                config.max_concurrency,
            )),
            Arc::new(Synchronizer::new(
                SNACK_PROJECTION,
                snack_reconciler.clone(),
                config.max_concurrency,
            )),
            Arc::new(Synchronizer::new(
                PURCHASE_PROJECTION,
                purchase_reconciler,
                config.max_concurrency,
            )),
        ];

        let registry: Arc<dyn ReminderRegistry> = match &config.reminder_file {
            Some(path) => Arc::new(FileReminderRegistry::new(path.clone())),
            None => Arc::new(InMemoryReminderRegistry::new()),
        };
        let reminders = Arc::new(SyncReminders::new(synchronizers.clone()));
        let scheduler = ReminderScheduler::new(registry, reminders.clone());

        Self {
            config,
            service: Arc::new(VendingService::new(machines, snacks, purchases)),
            channels,
            stores,
            cache,
            machine_projector,
            snack_projector,
            purchase_projector,
            machine_reconciler,
            snack_reconciler,
            synchronizers,
            reminders,
            scheduler,
            runners: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<VendingService> {
        &self.service
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn cache(&self) -> &Arc<SnackInfoCache> {
        &self.cache
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    pub fn synchronizers(&self) -> &[Arc<dyn Resync>] {
        &self.synchronizers
    }

    /// Start the pumps from the beginning of every stream and schedule the
    /// drift scans
    ///
    /// Calling `start` again while running is a no-op for the pumps.
    pub async fn start(&self) -> ReminderResult<()> {
        {
            let mut runners = self.runners.lock().await;
            if runners.is_empty() {
                let shards = self.config.shards;
                runners.push(spawn_projector(
                    MACHINE_PROJECTION,
                    self.machine_projector.clone(),
                    &self.channels.machines,
                    ResumeToken::START,
                    shards,
                ));
                runners.push(spawn_projector(
                    SNACK_PROJECTION,
                    self.snack_projector.clone(),
                    &self.channels.snacks,
                    ResumeToken::START,
                    shards,
                ));
                runners.push(spawn_projector(
                    PURCHASE_PROJECTION,
                    self.purchase_projector.clone(),
                    &self.channels.purchases,
                    ResumeToken::START,
                    shards,
                ));
                runners.push(spawn_broadcast_listener(
                    &self.channels.broadcast,
                    ResumeToken::START,
                    self.machine_reconciler.clone(),
                    self.snack_reconciler.clone(),
                ));
                runners.push(spawn_cache_listener(
                    &self.channels.notices,
                    ResumeToken::START,
                    self.cache.clone(),
                ));
            }
        }

        self.scheduler.restore().await?;
        let reminders = self.reminders.reminders(
            (self.config.differences_due, self.config.differences_period),
            (self.config.full_due, self.config.full_period),
        );
        for reminder in reminders {
            self.scheduler.start(reminder).await?;
        }

        info!(shards = self.config.shards, "Vending system started");
        Ok(())
    }

    fn synchronizer(&self, projection: &str) -> Option<&Arc<dyn Resync>> {
        self.synchronizers
            .iter()
            .find(|sync| sync.projection_name() == projection)
    }

    /// Rebuild one row of the named projection now
    ///
    /// `None` when no projection carries that name.
    pub async fn sync_one(&self, projection: &str, id: Uuid) -> Option<RebuildOutcome> {
        let sync = self.synchronizer(projection)?;
        Some(sync.sync_one(id).await)
    }

    /// Run a differences-only drift scan on every projection now
    pub async fn sync_differences(&self) -> ProjectionResult<Vec<SyncReport>> {
        let mut reports = Vec::with_capacity(self.synchronizers.len());
        for sync in &self.synchronizers {
            reports.push(sync.sync_differences_only().await?);
        }
        Ok(reports)
    }

    /// Run a full drift scan on every projection now
    pub async fn sync_all(&self) -> ProjectionResult<Vec<SyncReport>> {
        let mut reports = Vec::with_capacity(self.synchronizers.len());
        for sync in &self.synchronizers {
            reports.push(sync.sync_all().await?);
        }
        Ok(reports)
    }

    /// Stop every pump and ticker; reminder registrations stay persisted
    pub async fn shutdown(&self) {
        self.scheduler.shutdown();
        let runners: Vec<RunnerHandle> = self.runners.lock().await.drain(..).collect();
        for runner in runners {
            runner.stop().await;
        }
        info!("Vending system stopped");
    }
}
