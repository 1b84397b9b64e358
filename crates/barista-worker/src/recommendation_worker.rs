// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recommendation worker.
//!
//! Periodically scans the queue for pending records, asks the provider for
//! each one, and writes the answer back together with the completion flag.
//!
//! Records are handled one at a time, oldest first. A failure on one record
//! (provider error, store error or panic) is logged and the scan moves on;
//! the record stays pending and is picked up again on a later cycle.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use barista_core::persistence::{PreferenceRecord, PreferenceStore};
use futures::FutureExt;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::provider::RecommendationProvider;

/// Recommendation worker configuration.
#[derive(Debug, Clone)]
pub struct RecommendationWorkerConfig {
    /// Wait between scans when there is nothing more to do
    pub poll_interval: Duration,
    /// Maximum pending records handled per scan
    pub batch_size: i64,
}

impl Default for RecommendationWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 50,
        }
    }
}

impl RecommendationWorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BARISTA_WORKER_POLL_INTERVAL_MS`: milliseconds between scans (default: 1000)
    /// - `BARISTA_WORKER_BATCH_SIZE`: max records per scan (default: 50)
    pub fn from_env() -> Self {
        let poll_interval_ms = std::env::var("BARISTA_WORKER_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let batch_size = std::env::var("BARISTA_WORKER_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v: &i64| *v > 0)
            .unwrap_or(50);

        Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            batch_size,
        }
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Pending records returned by the scan.
    pub scanned: usize,
    /// Records completed in this cycle.
    pub completed: usize,
    /// Records left pending after a provider or store error.
    pub failed: usize,
    /// Records that were already completed or gone when the result was written.
    pub skipped: usize,
}

enum CycleOutcome {
    Finished(CycleReport),
    Stopped(CycleReport),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Background task that fulfils pending recommendation requests.
pub struct RecommendationWorker {
    store: Arc<dyn PreferenceStore>,
    provider: Arc<dyn RecommendationProvider>,
    config: RecommendationWorkerConfig,
    shutdown: Arc<Notify>,
    completion: Option<Arc<Notify>>,
}

impl RecommendationWorker {
    /// Create a new recommendation worker.
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        provider: Arc<dyn RecommendationProvider>,
        config: RecommendationWorkerConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            shutdown: Arc::new(Notify::new()),
            completion: None,
        }
    }

    /// Wake in-process submitters after each completed record.
    pub fn with_completion_notify(mut self, notify: Arc<Notify>) -> Self {
        self.completion = Some(notify);
        self
    }

    /// Get a handle to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the worker loop until shutdown is signalled.
    ///
    /// Shutdown is checked before every record. A provider call that is
    /// already in flight finishes and its result is written before the loop
    /// exits; no new call is started after the signal.
    pub async fn run(&self) {
        info!(
            provider = self.provider.provider_type(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Recommendation worker started"
        );

        let shutdown = self.shutdown.notified();
        tokio::pin!(shutdown);
        shutdown.as_mut().enable();

        loop {
            let rescan_now = match self.cycle(Some(shutdown.as_mut())).await {
                Ok(CycleOutcome::Stopped(_)) => {
                    info!("Recommendation worker received shutdown signal mid-cycle");
                    break;
                }
                Ok(CycleOutcome::Finished(report)) => {
                    // A full batch that made progress likely has more behind it.
                    report.completed > 0 && report.scanned as i64 >= self.config.batch_size
                }
                Err(e) => {
                    error!(error = %e, "Failed to scan pending recommendations");
                    false
                }
            };

            let wait = if rescan_now {
                Duration::ZERO
            } else {
                self.config.poll_interval
            };

            tokio::select! {
                biased;

                _ = shutdown.as_mut() => {
                    info!("Recommendation worker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("Recommendation worker stopped");
    }

    /// Scan once and handle every pending record found.
    ///
    /// Only the scan itself can fail; per-record errors and panics are
    /// counted in the report.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        match self.cycle(None).await? {
            CycleOutcome::Finished(report) | CycleOutcome::Stopped(report) => Ok(report),
        }
    }

    async fn cycle(&self, mut shutdown: Option<Pin<&mut Notified<'_>>>) -> Result<CycleOutcome> {
        let pending = self.store.list_pending(self.config.batch_size).await?;

        let mut report = CycleReport {
            scanned: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            debug!("No pending recommendation requests");
            return Ok(CycleOutcome::Finished(report));
        }

        for record in &pending {
            if let Some(signal) = shutdown.as_mut()
                && signal.as_mut().now_or_never().is_some()
            {
                info!(
                    handled = report.completed + report.failed + report.skipped,
                    scanned = report.scanned,
                    "Stopping cycle early, remaining requests stay pending"
                );
                return Ok(CycleOutcome::Stopped(report));
            }

            let outcome = AssertUnwindSafe(self.process_record(record))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(true)) => report.completed += 1,
                Ok(Ok(false)) => report.skipped += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    if e.is_upstream() {
                        warn!(request_id = record.id, error = %e, "Provider call failed, leaving request pending");
                    } else {
                        error!(request_id = record.id, error = %e, "Failed to store recommendation");
                    }
                }
                Err(panic) => {
                    report.failed += 1;
                    error!(
                        request_id = record.id,
                        panic = %panic_message(panic.as_ref()),
                        "Recommendation request panicked, leaving request pending"
                    );
                }
            }
        }

        info!(
            scanned = report.scanned,
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped,
            "Recommendation cycle finished"
        );

        Ok(CycleOutcome::Finished(report))
    }

    /// Ask the provider about one record and store the answer.
    ///
    /// Returns false if the record was completed or removed by someone else
    /// in the meantime.
    async fn process_record(&self, record: &PreferenceRecord) -> Result<bool> {
        let description = record.description();
        debug!(request_id = record.id, user_id = record.user_id, %description, "Requesting recommendation");

        let text = self.provider.recommend(&description).await?;

        let stored = self.store.complete_preference(record.id, &text).await?;
        if stored {
            debug!(request_id = record.id, "Recommendation stored");
            if let Some(notify) = &self.completion {
                notify.notify_waiters();
            }
        } else {
            warn!(request_id = record.id, "Request already completed or removed, dropping result");
        }

        Ok(stored)
    }
}
