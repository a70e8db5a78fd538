// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cross-aggregate statistics
//!
//! Counters a row needs from aggregates of another kind, read from their
//! authoritative owners during a full rebuild.
//!
//! Purchases never change after they are initialized, so sales are folded
//! into an index keyed by machine and by snack. Each lookup only loads the
//! purchases committed since the previous one.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::aggregate::{Machine, Purchase};
use crate::errors::RuntimeResult;
use crate::runtime::AggregateHost;

/// Number and value of purchases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalesStats {
    pub count: u64,
    pub amount: u64,
}

/// Stock of one snack across live machines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockStats {
    pub machine_count: u32,
    pub total_quantity: u64,
    pub total_amount: u64,
}

#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn machine_sales(&self, machine_id: Uuid) -> RuntimeResult<SalesStats>;

    async fn snack_sales(&self, snack_id: Uuid) -> RuntimeResult<SalesStats>;

    async fn snack_stock(&self, snack_id: Uuid) -> RuntimeResult<StockStats>;
}

impl SalesStats {
    fn record(&mut self, bought_price: u64) {
        self.count += 1;
        self.amount += bought_price;
    }
}

#[derive(Debug, Default)]
struct SalesIndex {
    counted: HashSet<Uuid>,
    by_machine: HashMap<Uuid, SalesStats>,
    by_snack: HashMap<Uuid, SalesStats>,
}

/// Statistics read from the machine and purchase hosts
pub struct HostStats {
    machines: Arc<AggregateHost<Machine>>,
    purchases: Arc<AggregateHost<Purchase>>,
    sales: Mutex<SalesIndex>,
}

impl HostStats {
    pub fn new(machines: Arc<AggregateHost<Machine>>, purchases: Arc<AggregateHost<Purchase>>) -> Self {
        Self {
            machines,
            purchases,
            sales: Mutex::new(SalesIndex::default()),
        }
    }

    /// Fold purchases committed since the last lookup, then read the index
    async fn sales<F>(&self, read: F) -> RuntimeResult<SalesStats>
    where
        F: FnOnce(&SalesIndex) -> Option<SalesStats> + Send,
    {
        let mut index = self.sales.lock().await;
        for id in self.purchases.ids().await? {
            if index.counted.contains(&id) {
                continue;
            }
            let Some(purchase) = self.purchases.find(id).await? else {
                continue;
            };
            index
                .by_machine
                .entry(purchase.machine_id)
                .or_default()
                .record(purchase.bought_price);
            index
                .by_snack
                .entry(purchase.snack_id)
                .or_default()
                .record(purchase.bought_price);
            index.counted.insert(id);
        }
        Ok(read(&index).unwrap_or_default())
    }
}

#[async_trait]
impl StatsSource for HostStats {
    async fn machine_sales(&self, machine_id: Uuid) -> RuntimeResult<SalesStats> {
        self.sales(|index| index.by_machine.get(&machine_id).copied())
            .await
    }

    async fn snack_sales(&self, snack_id: Uuid) -> RuntimeResult<SalesStats> {
        self.sales(|index| index.by_snack.get(&snack_id).copied())
            .await
    }

    async fn snack_stock(&self, snack_id: Uuid) -> RuntimeResult<StockStats> {
        let mut stats = StockStats::default();
        for id in self.machines.ids().await? {
            let Some(machine) = self.machines.find(id).await? else {
                continue;
            };
            if machine.is_deleted {
                continue;
            }

            let piles: Vec<_> = machine
                .slots
                .iter()
                .filter_map(|slot| slot.snack_pile)
                .filter(|pile| pile.snack_id == snack_id && pile.quantity > 0)
                .collect();
            if piles.is_empty() {
                continue;
            }

            stats.machine_count += 1;
            stats.total_quantity += piles.iter().map(|pile| u64::from(pile.quantity)).sum::<u64>();
            stats.total_amount += piles.iter().map(|pile| pile.amount()).sum::<u64>();
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{CommandContext, PurchaseCommand};
    use crate::publisher::LogPublisher;
    use crate::runtime::{InMemoryEventLog, InMemoryStateStore};
    use chrono::Utc;

    fn stats() -> (HostStats, Arc<AggregateHost<Purchase>>) {
        let machines = Arc::new(AggregateHost::new(
            Arc::new(InMemoryStateStore::<Machine>::new()),
            Arc::new(LogPublisher::<Machine>::new(
                InMemoryEventLog::new("machine"),
                InMemoryEventLog::new("broadcast"),
            )),
        ));
        let purchases = Arc::new(AggregateHost::new(
            Arc::new(InMemoryStateStore::<Purchase>::new()),
            Arc::new(LogPublisher::<Purchase>::new(
                InMemoryEventLog::new("purchase"),
                InMemoryEventLog::new("broadcast"),
            )),
        ));
        (HostStats::new(machines, purchases.clone()), purchases)
    }

    async fn buy(purchases: &AggregateHost<Purchase>, machine_id: Uuid, snack_id: Uuid, price: u64) {
        purchases
            .execute(
                Uuid::now_v7(),
                PurchaseCommand::Initialize {
                    machine_id,
                    position: 1,
                    snack_id,
                    bought_price: price,
                },
                &CommandContext::new("operator", Utc::now()),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sales_index_picks_up_new_purchases() {
        let (stats, purchases) = stats();
        let machine = Uuid::now_v7();
        let chips = Uuid::now_v7();
        let soda = Uuid::now_v7();

        buy(&purchases, machine, chips, 3).await;
        buy(&purchases, machine, soda, 4).await;
        assert_eq!(
            stats.machine_sales(machine).await.unwrap(),
            SalesStats { count: 2, amount: 7 }
        );

        buy(&purchases, machine, chips, 3).await;

        assert_eq!(
            stats.machine_sales(machine).await.unwrap(),
            SalesStats { count: 3, amount: 10 }
        );
        assert_eq!(
            stats.snack_sales(chips).await.unwrap(),
            SalesStats { count: 2, amount: 6 }
        );
        assert_eq!(
            stats.snack_sales(Uuid::now_v7()).await.unwrap(),
            SalesStats::default()
        );
    }
}
