// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker for reclaiming abandoned queue records.
//!
//! A submitter that runs out of poll budget leaves its record behind. The
//! worker may still complete it later, but nobody will read or delete it.
//! This sweep deletes every record older than the configured age, pending
//! or completed.
//!
//! `max_age` has to stay above the submitter's total wait, otherwise a
//! record could be removed while its submitter is still polling.

use std::sync::Arc;
use std::time::Duration;

use barista_core::RetryPolicy;
use barista_core::persistence::PreferenceStore;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::config::ConfigError;
use crate::error::Result;

/// Configuration for the reclaim worker.
#[derive(Debug, Clone)]
pub struct ReclaimWorkerConfig {
    /// Whether the sweep runs at all.
    pub enabled: bool,
    /// How often to sweep.
    pub poll_interval: Duration,
    /// Records older than this are deleted.
    pub max_age: Duration,
    /// Maximum records to delete per batch.
    pub batch_size: i64,
}

impl Default for ReclaimWorkerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval: Duration::from_secs(300),
            max_age: Duration::from_secs(3600),
            batch_size: 100,
        }
    }
}

impl ReclaimWorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BARISTA_RECLAIM_ENABLED`: "true" or "1" to enable (default: false)
    /// - `BARISTA_RECLAIM_POLL_INTERVAL_SECS`: seconds between sweeps (default: 300)
    /// - `BARISTA_RECLAIM_MAX_AGE_SECS`: record age before deletion (default: 3600)
    /// - `BARISTA_RECLAIM_BATCH_SIZE`: max records per batch (default: 100)
    pub fn from_env() -> Self {
        let enabled = std::env::var("BARISTA_RECLAIM_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let poll_interval_secs = std::env::var("BARISTA_RECLAIM_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let max_age_secs = std::env::var("BARISTA_RECLAIM_MAX_AGE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let batch_size = std::env::var("BARISTA_RECLAIM_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v: &i64| *v > 0)
            .unwrap_or(100);

        Self {
            enabled,
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_age: Duration::from_secs(max_age_secs),
            batch_size,
        }
    }

    /// Reject a max age that could delete records a submitter is still polling.
    ///
    /// A disabled sweep never conflicts.
    pub fn check_against(&self, submitter: RetryPolicy) -> std::result::Result<(), ConfigError> {
        let budget = submitter.total_wait();
        if self.enabled && self.max_age <= budget {
            return Err(ConfigError::ReclaimTooEager {
                max_age_secs: self.max_age.as_secs(),
                budget_secs: budget.as_secs(),
            });
        }
        Ok(())
    }
}

/// Background worker that deletes abandoned queue records.
pub struct ReclaimWorker {
    store: Arc<dyn PreferenceStore>,
    config: ReclaimWorkerConfig,
    shutdown: Arc<Notify>,
}

impl ReclaimWorker {
    /// Create a new reclaim worker.
    pub fn new(store: Arc<dyn PreferenceStore>, config: ReclaimWorkerConfig) -> Self {
        Self {
            store,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the sweep loop.
    ///
    /// Returns immediately when disabled. Otherwise sweeps every
    /// `poll_interval` until the shutdown signal is received.
    pub async fn run(&self) {
        if !self.config.enabled {
            info!("Reclaim worker disabled");
            return;
        }

        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_age_secs = self.config.max_age.as_secs(),
            batch_size = self.config.batch_size,
            "Reclaim worker started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Reclaim worker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.reclaim_stale().await {
                        error!(error = %e, "Failed to reclaim stale recommendation requests");
                    }
                }
            }
        }

        info!("Reclaim worker stopped");
    }

    /// Delete every record older than `max_age`, batch by batch.
    ///
    /// Returns the number of deleted records.
    pub async fn reclaim_stale(&self) -> Result<u64> {
        let max_age_secs = i64::try_from(self.config.max_age.as_secs()).unwrap_or(i64::MAX);
        let mut total_deleted = 0u64;

        loop {
            let ids = self
                .store
                .list_stale_preferences(max_age_secs, self.config.batch_size)
                .await?;

            if ids.is_empty() {
                break;
            }

            let batch_size = ids.len();
            let deleted = self.store.delete_preferences_batch(&ids).await?;
            total_deleted += deleted;

            debug!(
                batch_size = batch_size,
                deleted = deleted,
                total_deleted = total_deleted,
                "Reclaimed batch of requests"
            );

            if batch_size < self.config.batch_size as usize {
                break;
            }
        }

        if total_deleted > 0 {
            info!(
                total_deleted = total_deleted,
                max_age_secs = max_age_secs,
                "Reclaim cycle completed"
            );
        } else {
            debug!("Reclaim cycle completed, no stale requests found");
        }

        Ok(total_deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ReclaimWorkerConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.max_age, Duration::from_secs(3600));
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_default_max_age_outlasts_default_poll_budget() {
        let config = ReclaimWorkerConfig::default();
        let budget = barista_core::RetryPolicy::default().total_wait();
        assert!(config.max_age > budget);
    }

    #[test]
    fn test_check_against_submitter_budget() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1));
        let eager = ReclaimWorkerConfig {
            enabled: true,
            max_age: Duration::from_secs(10),
            ..Default::default()
        };

        assert!(matches!(
            eager.check_against(policy),
            Err(ConfigError::ReclaimTooEager {
                max_age_secs: 10,
                budget_secs: 10
            })
        ));
        assert!(
            ReclaimWorkerConfig {
                enabled: false,
                ..eager.clone()
            }
            .check_against(policy)
            .is_ok()
        );
        assert!(
            ReclaimWorkerConfig {
                max_age: Duration::from_secs(11),
                ..eager
            }
            .check_against(policy)
            .is_ok()
        );
    }
}
