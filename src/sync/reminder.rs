// Copyright (c) 2025 - Cowboy AI, Inc.
//! Durable reminders
//!
//! A reminder is a named, persisted registration that fires after a due time
//! and then once per period. Registrations outlive the process; after a
//! restart [`ReminderScheduler::restore`] re-spawns every one of them.
//!
//! ```text
//! start(reminder) → registry.register → (re)spawn ticker ─┐
//!                                                          ↓
//!                          sleep(due) → loop { target.receive_reminder(name); sleep(period) }
//! stop(name)      → registry.unregister → abort ticker
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::synchronizer::Resync;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Reminder {name} has a zero period")]
    ZeroPeriod { name: String },

    #[error("Reminder storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Reminder serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ReminderResult<T> = Result<T, ReminderError>;

/// A named periodic registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub name: String,

    /// Delay before the first firing
    pub due_time: Duration,

    pub period: Duration,
}

impl Reminder {
    pub fn new(name: impl Into<String>, due_time: Duration, period: Duration) -> Self {
        Self {
            name: name.into(),
            due_time,
            period,
        }
    }
}

/// Persistent set of reminder registrations, keyed by name
#[async_trait]
pub trait ReminderRegistry: Send + Sync {
    /// Insert or replace a registration
    async fn register(&self, reminder: Reminder) -> ReminderResult<()>;

    /// Remove a registration; `false` if none existed
    async fn unregister(&self, name: &str) -> ReminderResult<bool>;

    async fn get(&self, name: &str) -> ReminderResult<Option<Reminder>>;

    async fn list(&self) -> ReminderResult<Vec<Reminder>>;
}

#[derive(Default)]
pub struct InMemoryReminderRegistry {
    reminders: RwLock<BTreeMap<String, Reminder>>,
}

impl InMemoryReminderRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReminderRegistry for InMemoryReminderRegistry {
    async fn register(&self, reminder: Reminder) -> ReminderResult<()> {
        self.reminders
            .write()
            .await
            .insert(reminder.name.clone(), reminder);
        Ok(())
    }

    async fn unregister(&self, name: &str) -> ReminderResult<bool> {
        Ok(self.reminders.write().await.remove(name).is_some())
    }

    async fn get(&self, name: &str) -> ReminderResult<Option<Reminder>> {
        Ok(self.reminders.read().await.get(name).cloned())
    }

    async fn list(&self) -> ReminderResult<Vec<Reminder>> {
        Ok(self.reminders.read().await.values().cloned().collect())
    }
}

/// Registrations kept in one JSON file
///
/// Every change rewrites the whole file through a temp file and a rename.
pub struct FileReminderRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileReminderRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> ReminderResult<BTreeMap<String, Reminder>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => {
                let reminders: Vec<Reminder> = serde_json::from_str(&content)?;
                Ok(reminders
                    .into_iter()
                    .map(|reminder| (reminder.name.clone(), reminder))
                    .collect())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, reminders: &BTreeMap<String, Reminder>) -> ReminderResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(&reminders.values().collect::<Vec<_>>())?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.path).await?;

        debug!(path = %self.path.display(), count = reminders.len(), "Reminders saved");
        Ok(())
    }
}

#[async_trait]
impl ReminderRegistry for FileReminderRegistry {
    async fn register(&self, reminder: Reminder) -> ReminderResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut reminders = self.load().await?;
        reminders.insert(reminder.name.clone(), reminder);
        self.save(&reminders).await
    }

    async fn unregister(&self, name: &str) -> ReminderResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut reminders = self.load().await?;
        let removed = reminders.remove(name).is_some();
        if removed {
            self.save(&reminders).await?;
        }
        Ok(removed)
    }

    async fn get(&self, name: &str) -> ReminderResult<Option<Reminder>> {
        Ok(self.load().await?.remove(name))
    }

    async fn list(&self) -> ReminderResult<Vec<Reminder>> {
        Ok(self.load().await?.into_values().collect())
    }
}

/// Receives reminder firings
#[async_trait]
pub trait ReminderTarget: Send + Sync {
    async fn receive_reminder(&self, name: &str);
}

/// Runs one ticking task per registered reminder
pub struct ReminderScheduler {
    registry: Arc<dyn ReminderRegistry>,
    target: Arc<dyn ReminderTarget>,
    tasks: StdMutex<HashMap<String, JoinHandle<()>>>,
}

impl ReminderScheduler {
    pub fn new(registry: Arc<dyn ReminderRegistry>, target: Arc<dyn ReminderTarget>) -> Self {
        Self {
            registry,
            target,
            tasks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<dyn ReminderRegistry> {
        &self.registry
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a reminder and (re)start its ticker
    ///
    /// Starting an already running reminder replaces its schedule.
    pub async fn start(&self, reminder: Reminder) -> ReminderResult<()> {
        if reminder.period.is_zero() {
            return Err(ReminderError::ZeroPeriod {
                name: reminder.name,
            });
        }

        self.registry.register(reminder.clone()).await?;
        info!(
            reminder = %reminder.name,
            due_ms = reminder.due_time.as_millis() as u64,
            period_ms = reminder.period.as_millis() as u64,
            "Reminder started"
        );
        self.spawn(reminder);
        Ok(())
    }

    /// Unregister a reminder and stop its ticker
    pub async fn stop(&self, name: &str) -> ReminderResult<bool> {
        let removed = self.registry.unregister(name).await?;
        if let Some(task) = self.tasks().remove(name) {
            task.abort();
        }
        info!(reminder = %name, removed, "Reminder stopped");
        Ok(removed)
    }

    /// Re-spawn every persisted registration that is not already ticking
    pub async fn restore(&self) -> ReminderResult<usize> {
        let mut restored = 0;
        for reminder in self.registry.list().await? {
            if reminder.period.is_zero() {
                warn!(reminder = %reminder.name, "Skipping persisted reminder with zero period");
                continue;
            }
            if self.is_running(&reminder.name) {
                continue;
            }
            self.spawn(reminder);
            restored += 1;
        }
        info!(restored, "Reminders restored");
        Ok(restored)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.tasks()
            .get(name)
            .is_some_and(|task| !task.is_finished())
    }

    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tasks()
            .iter()
            .filter(|(_, task)| !task.is_finished())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Abort every ticker; registrations stay persisted
    pub fn shutdown(&self) {
        for (name, task) in self.tasks().drain() {
            debug!(reminder = %name, "Ticker aborted");
            task.abort();
        }
    }

    fn spawn(&self, reminder: Reminder) {
        let target = Arc::clone(&self.target);
        let name = reminder.name.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(reminder.due_time).await;
            loop {
                debug!(reminder = %reminder.name, "Reminder fired");
                target.receive_reminder(&reminder.name).await;
                tokio::time::sleep(reminder.period).await;
            }
        });

        if let Some(previous) = self.tasks().insert(name, task) {
            previous.abort();
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Which scan a sync reminder runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    DifferencesOnly,
    All,
}

impl SyncKind {
    fn suffix(self) -> &'static str {
        match self {
            SyncKind::DifferencesOnly => "-sync-differences",
            SyncKind::All => "-sync-all",
        }
    }

    /// Reminder name for a projection
    pub fn reminder_name(self, projection: &str) -> String {
        format!("{}{}", projection, self.suffix())
    }

    /// Split a reminder name into projection and scan kind
    pub fn parse(name: &str) -> Option<(&str, SyncKind)> {
        [SyncKind::DifferencesOnly, SyncKind::All]
            .into_iter()
            .find_map(|kind| name.strip_suffix(kind.suffix()).map(|projection| (projection, kind)))
    }
}

/// Reminder target that runs the drift scans of its synchronizers
pub struct SyncReminders {
    synchronizers: Vec<Arc<dyn Resync>>,
}

impl SyncReminders {
    pub fn new(synchronizers: Vec<Arc<dyn Resync>>) -> Self {
        Self { synchronizers }
    }

    /// Both reminders for every synchronizer
    pub fn reminders(
        &self,
        differences: (Duration, Duration),
        full: (Duration, Duration),
    ) -> Vec<Reminder> {
        self.synchronizers
            .iter()
            .flat_map(|sync| {
                let name = sync.projection_name();
                [
                    Reminder::new(
                        SyncKind::DifferencesOnly.reminder_name(name),
                        differences.0,
                        differences.1,
                    ),
                    Reminder::new(SyncKind::All.reminder_name(name), full.0, full.1),
                ]
            })
            .collect()
    }
}

#[async_trait]
impl ReminderTarget for SyncReminders {
    async fn receive_reminder(&self, name: &str) {
        let Some((projection, kind)) = SyncKind::parse(name) else {
            warn!(reminder = %name, "Unknown reminder");
            return;
        };
        let Some(sync) = self
            .synchronizers
            .iter()
            .find(|sync| sync.projection_name() == projection)
        else {
            warn!(reminder = %name, projection, "No synchronizer for reminder");
            return;
        };

        let result = match kind {
            SyncKind::DifferencesOnly => sync.sync_differences_only().await,
            SyncKind::All => sync.sync_all().await,
        };
        match result {
            Ok(report) if report.is_clean() => {
                debug!(reminder = %name, ?report, "Scheduled sync finished");
            }
            Ok(report) => {
                warn!(reminder = %name, failed = report.failed.len(), "Scheduled sync left failures");
            }
            Err(e) => error!(reminder = %name, error = %e, "Scheduled sync failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_reminder_names() {
        assert_eq!(
            SyncKind::DifferencesOnly.reminder_name("machine-info"),
            "machine-info-sync-differences"
        );
        assert_eq!(
            SyncKind::parse("snack-info-sync-all"),
            Some(("snack-info", SyncKind::All))
        );
        assert_eq!(SyncKind::parse("snack-info"), None);
    }

    #[tokio::test]
    async fn test_in_memory_registry_replaces_by_name() {
        let registry = InMemoryReminderRegistry::new();
        registry
            .register(Reminder::new("a", Duration::ZERO, Duration::from_secs(1)))
            .await
            .unwrap();
        registry
            .register(Reminder::new("a", Duration::ZERO, Duration::from_secs(5)))
            .await
            .unwrap();

        let all = registry.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].period, Duration::from_secs(5));
        assert!(registry.unregister("a").await.unwrap());
        assert!(!registry.unregister("a").await.unwrap());
    }

    struct Counter(std::sync::atomic::AtomicU32);

    #[async_trait]
    impl ReminderTarget for Counter {
        async fn receive_reminder(&self, _name: &str) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_ticks_until_stopped() {
        // Arrange
        let counter = Arc::new(Counter(std::sync::atomic::AtomicU32::new(0)));
        let scheduler = ReminderScheduler::new(Arc::new(InMemoryReminderRegistry::new()), counter.clone());

        // Act
        scheduler
            .start(Reminder::new(
                "tick",
                Duration::from_secs(1),
                Duration::from_secs(10),
            ))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(25)).await;
        scheduler.stop("tick").await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        // Assert: fired at 1s, 11s and 21s
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert!(!scheduler.is_running("tick"));
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let scheduler = ReminderScheduler::new(
            Arc::new(InMemoryReminderRegistry::new()),
            Arc::new(Counter(std::sync::atomic::AtomicU32::new(0))),
        );

        let result = scheduler
            .start(Reminder::new("bad", Duration::ZERO, Duration::ZERO))
            .await;

        assert!(matches!(result, Err(ReminderError::ZeroPeriod { .. })));
        assert!(scheduler.registry().list().await.unwrap().is_empty());
    }
}
