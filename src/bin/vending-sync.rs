// Copyright (c) 2025 - Cowboy AI, Inc.
//! Vending Sync Service
//!
//! Runs the vending aggregates, the incremental projectors and the scheduled
//! drift scans, and logs every projection notice until interrupted.
//!
//! Run with: cargo run --bin vending-sync
//!
//! Configuration comes from `VENDING_*` environment variables (see
//! `vending_sync::config`). Set `VENDING_DEMO=1` to seed a machine and a
//! snack and buy one on startup.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vending_sync::domain::{Denomination, Money, Slot, SnackPile};
use vending_sync::projection::ProjectionNotice;
use vending_sync::runtime::ResumeToken;
use vending_sync::{CommandContext, SyncConfig, VendingSystem};

async fn seed_demo(system: &VendingSystem) -> Result<()> {
    let service = system.service();
    let ctx = CommandContext::new("vending-sync-demo", Utc::now());
    let snack_id = Uuid::now_v7();
    let machine_id = Uuid::now_v7();

    service
        .initialize_snack(snack_id, "Chips", None, &ctx)
        .await
        .context("Failed to create demo snack")?;
    service
        .initialize_machine(
            machine_id,
            vec![Slot::empty(1), Slot::empty(2)],
            Money::of(Denomination::One, 10),
            &ctx,
        )
        .await
        .context("Failed to create demo machine")?;
    service
        .load_snacks(
            machine_id,
            1,
            SnackPile {
                snack_id,
                quantity: 5,
                price: 3,
            },
            &ctx,
        )
        .await
        .context("Failed to load demo snacks")?;
    service
        .insert_money(machine_id, Money::of(Denomination::Five, 1), &ctx)
        .await
        .context("Failed to insert demo money")?;
    let receipt = service
        .buy_snack(machine_id, 1, &ctx)
        .await
        .context("Failed to buy demo snack")?;

    info!(
        machine_id = %machine_id,
        snack_id = %snack_id,
        purchase_id = %receipt.purchase_id,
        "Demo data seeded"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting vending sync service");

    let config = SyncConfig::from_env().context("Invalid VENDING_* configuration")?;
    info!(
        shards = config.shards,
        max_concurrency = config.max_concurrency,
        retry_attempts = config.retry.max_attempts,
        nats = config.nats_url.as_deref().unwrap_or("disabled"),
        reminder_file = ?config.reminder_file,
        "Configuration loaded"
    );

    let system = VendingSystem::build(config)
        .await
        .context("Failed to build vending system")?;
    system
        .start()
        .await
        .context("Failed to start vending system")?;

    if std::env::var("VENDING_DEMO").is_ok_and(|v| v == "1") {
        seed_demo(&system).await?;
    }

    let notices = system
        .channels()
        .notices
        .subscribe(ResumeToken::START)
        .into_stream();
    tokio::pin!(notices);

    let mut saved_count = 0u64;
    let mut error_count = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
            next = notices.next() => {
                let Some((record, _)) = next else {
                    break;
                };
                match record.message {
                    ProjectionNotice::Error(error) => {
                        error_count += 1;
                        warn!(
                            aggregate_id = %error.aggregate_id,
                            code = error.code,
                            reasons = ?error.reasons,
                            "Projection failure"
                        );
                    }
                    notice => {
                        saved_count += 1;
                        debug!(row_id = %notice.row_id(), kind = ?notice.kind(), "Projection updated");
                    }
                }
            }
        }
    }

    system.shutdown().await;
    info!(saved_count, error_count, "Vending sync service stopped");
    Ok(())
}
