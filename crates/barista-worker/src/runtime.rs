// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for barista-worker.
//!
//! [`WorkerRuntime`] runs the recommendation worker and the reclaim sweep as
//! tokio tasks, either in the standalone `barista-worker` binary or inside an
//! existing application next to the API.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use barista_worker::provider::HttpRecommendationProvider;
//! use barista_worker::runtime::WorkerRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = barista_core::persistence::connect("postgres://...", 5).await?;
//!     let provider = Arc::new(HttpRecommendationProvider::new(
//!         "https://example.test/chat/",
//!         Duration::from_secs(30),
//!     )?);
//!
//!     let runtime = WorkerRuntime::builder()
//!         .store(store)
//!         .provider(provider)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     // ... run your application ...
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Same-process API
//!
//! When the API runs in the same process, hand both sides one `Notify`:
//! the worker fires it after each completed record and the submitter wakes
//! up early instead of waiting for its next poll.
//!
//! ```rust,ignore
//! let completion = Arc::new(tokio::sync::Notify::new());
//! let submitter = RecommendationSubmitter::new(store.clone(), policy)
//!     .with_completion_notify(completion.clone());
//! let runtime = WorkerRuntime::builder()
//!     .store(store)
//!     .provider(provider)
//!     .completion_notify(completion)
//!     .build()?
//!     .start()
//!     .await?;
//! ```

use std::sync::Arc;

use anyhow::Result;
use barista_core::RetryPolicy;
use barista_core::persistence::PreferenceStore;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::provider::RecommendationProvider;
use crate::reclaim_worker::{ReclaimWorker, ReclaimWorkerConfig};
use crate::recommendation_worker::{RecommendationWorker, RecommendationWorkerConfig};

/// Builder for creating a [`WorkerRuntime`].
#[derive(Default)]
pub struct WorkerRuntimeBuilder {
    store: Option<Arc<dyn PreferenceStore>>,
    provider: Option<Arc<dyn RecommendationProvider>>,
    worker_config: RecommendationWorkerConfig,
    reclaim_config: ReclaimWorkerConfig,
    submitter_policy: Option<RetryPolicy>,
    completion: Option<Arc<Notify>>,
}

impl WorkerRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the queue store (required).
    pub fn store(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the recommendation provider (required).
    pub fn provider(mut self, provider: Arc<dyn RecommendationProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the scan loop configuration.
    ///
    /// Default: 1 second poll interval, batches of 50
    pub fn worker_config(mut self, config: RecommendationWorkerConfig) -> Self {
        self.worker_config = config;
        self
    }

    /// Set the reclaim sweep configuration.
    ///
    /// Default: disabled
    pub fn reclaim_config(mut self, config: ReclaimWorkerConfig) -> Self {
        self.reclaim_config = config;
        self
    }

    /// Poll budget of the submitters reading this queue.
    ///
    /// The reclaim age is checked against it. Default: [`RetryPolicy::default`]
    pub fn submitter_policy(mut self, policy: RetryPolicy) -> Self {
        self.submitter_policy = Some(policy);
        self
    }

    /// Share a completion notifier with in-process submitters.
    pub fn completion_notify(mut self, notify: Arc<Notify>) -> Self {
        self.completion = Some(notify);
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing, or if an enabled
    /// reclaim sweep could delete records a submitter is still polling.
    pub fn build(self) -> Result<WorkerRuntimeConfig> {
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("store is required"))?;
        let provider = self
            .provider
            .ok_or_else(|| anyhow::anyhow!("provider is required"))?;

        if self.worker_config.batch_size <= 0 {
            anyhow::bail!("worker batch_size must be positive");
        }

        self.reclaim_config
            .check_against(self.submitter_policy.unwrap_or_default())?;

        Ok(WorkerRuntimeConfig {
            store,
            provider,
            worker_config: self.worker_config,
            reclaim_config: self.reclaim_config,
            completion: self.completion,
        })
    }
}

/// Configuration for a [`WorkerRuntime`].
pub struct WorkerRuntimeConfig {
    store: Arc<dyn PreferenceStore>,
    provider: Arc<dyn RecommendationProvider>,
    worker_config: RecommendationWorkerConfig,
    reclaim_config: ReclaimWorkerConfig,
    completion: Option<Arc<Notify>>,
}

impl WorkerRuntimeConfig {
    /// Start the runtime, spawning the worker tasks.
    pub async fn start(self) -> Result<WorkerRuntime> {
        let mut worker = RecommendationWorker::new(
            self.store.clone(),
            self.provider.clone(),
            self.worker_config,
        );
        if let Some(notify) = self.completion {
            worker = worker.with_completion_notify(notify);
        }
        let worker_shutdown = worker.shutdown_handle();

        let worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        let reclaim = if self.reclaim_config.enabled {
            let reclaim_worker = ReclaimWorker::new(self.store.clone(), self.reclaim_config);
            let shutdown = reclaim_worker.shutdown_handle();
            let handle = tokio::spawn(async move {
                reclaim_worker.run().await;
            });
            Some((handle, shutdown))
        } else {
            debug!("Reclaim sweep disabled; abandoned requests are kept");
            None
        };

        info!(
            provider = self.provider.provider_type(),
            reclaim = reclaim.is_some(),
            "WorkerRuntime started"
        );

        Ok(WorkerRuntime {
            worker_handle,
            worker_shutdown,
            reclaim,
        })
    }
}

/// A running barista-worker instance that can be embedded in an application.
///
/// The runtime manages:
/// - Recommendation worker filling in pending queue records
/// - Reclaim sweep removing abandoned records (optional)
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct WorkerRuntime {
    worker_handle: JoinHandle<()>,
    worker_shutdown: Arc<Notify>,
    reclaim: Option<(JoinHandle<()>, Arc<Notify>)>,
}

impl WorkerRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> WorkerRuntimeBuilder {
        WorkerRuntimeBuilder::new()
    }

    /// Gracefully shut down the runtime.
    ///
    /// Signals every task to stop and waits for them. A worker that is in
    /// the middle of a cycle finishes the record it is on, stores the answer,
    /// and leaves the rest of the batch pending.
    pub async fn shutdown(self) -> Result<()> {
        info!("WorkerRuntime shutting down...");

        self.worker_shutdown.notify_one();
        if let Some((_, shutdown)) = &self.reclaim {
            shutdown.notify_one();
        }

        let mut panicked = false;

        if let Err(e) = self.worker_handle.await {
            error!("Recommendation worker task panicked: {}", e);
            panicked = true;
        }

        if let Some((handle, _)) = self.reclaim
            && let Err(e) = handle.await
        {
            error!("Reclaim worker task panicked: {}", e);
            panicked = true;
        }

        if panicked {
            anyhow::bail!("worker task panicked");
        }

        info!("WorkerRuntime shutdown complete");
        Ok(())
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        let reclaim_running = self
            .reclaim
            .as_ref()
            .is_none_or(|(handle, _)| !handle.is_finished());

        !self.worker_handle.is_finished() && reclaim_running
    }
}
