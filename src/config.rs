// Copyright (c) 2025 - Cowboy AI, Inc.
//! Runtime configuration
//!
//! Every setting has a default and can be overridden by a `VENDING_*`
//! environment variable.
//!
//! | Variable | Default |
//! |---|---|
//! | `VENDING_RETRY_ATTEMPTS` | 3 |
//! | `VENDING_RETRY_DELAY_MS` | 100 |
//! | `VENDING_SYNC_DIFFERENCES_DUE_SECS` | 60 |
//! | `VENDING_SYNC_DIFFERENCES_PERIOD_SECS` | 300 |
//! | `VENDING_SYNC_ALL_DUE_SECS` | 600 |
//! | `VENDING_SYNC_ALL_PERIOD_SECS` | 3600 |
//! | `VENDING_MAX_CONCURRENCY` | 8 |
//! | `VENDING_SHARDS` | 4 |
//! | `VENDING_CACHE_CAPACITY` | 1024 |
//! | `VENDING_REMINDER_FILE` | unset (reminders kept in memory) |
//! | `VENDING_NATS_URL` | unset (no NATS mirror) |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{RuntimeError, RuntimeResult};
use crate::projection::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub retry: RetryPolicy,

    pub differences_due: Duration,
    pub differences_period: Duration,
    pub full_due: Duration,
    pub full_period: Duration,

    /// Concurrent rebuilds per drift scan
    pub max_concurrency: usize,

    /// Incremental projector workers per aggregate kind
    pub shards: usize,

    pub cache_capacity: usize,

    pub reminder_file: Option<PathBuf>,
    pub nats_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            differences_due: Duration::from_secs(60),
            differences_period: Duration::from_secs(300),
            full_due: Duration::from_secs(600),
            full_period: Duration::from_secs(3600),
            max_concurrency: 8,
            shards: 4,
            cache_capacity: 1024,
            reminder_file: None,
            nats_url: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> RuntimeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> RuntimeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| -> RuntimeResult<Option<u64>> { parse(&lookup, key) };
        let secs = |key: &str, default: Duration| -> RuntimeResult<Duration> {
            Ok(parsed(key)?.map_or(default, Duration::from_secs))
        };

        let retry = RetryPolicy {
            max_attempts: parse(&lookup, "VENDING_RETRY_ATTEMPTS")?
                .unwrap_or(defaults.retry.max_attempts),
            delay_unit: parsed("VENDING_RETRY_DELAY_MS")?
                .map_or(defaults.retry.delay_unit, Duration::from_millis),
        };
        if retry.max_attempts == 0 {
            return Err(RuntimeError::Configuration(
                "VENDING_RETRY_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let config = Self {
            retry,
            differences_due: secs("VENDING_SYNC_DIFFERENCES_DUE_SECS", defaults.differences_due)?,
            differences_period: secs(
                "VENDING_SYNC_DIFFERENCES_PERIOD_SECS",
                defaults.differences_period,
            )?,
            full_due: secs("VENDING_SYNC_ALL_DUE_SECS", defaults.full_due)?,
            full_period: secs("VENDING_SYNC_ALL_PERIOD_SECS", defaults.full_period)?,
            max_concurrency: parse(&lookup, "VENDING_MAX_CONCURRENCY")?
                .unwrap_or(defaults.max_concurrency),
            shards: parse(&lookup, "VENDING_SHARDS")?.unwrap_or(defaults.shards),
            cache_capacity: parse(&lookup, "VENDING_CACHE_CAPACITY")?
                .unwrap_or(defaults.cache_capacity),
            reminder_file: lookup("VENDING_REMINDER_FILE")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            nats_url: lookup("VENDING_NATS_URL").filter(|url| !url.trim().is_empty()),
        };

        if config.differences_period.is_zero() || config.full_period.is_zero() {
            return Err(RuntimeError::Configuration(
                "sync periods must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> RuntimeResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| RuntimeError::Configuration(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}
