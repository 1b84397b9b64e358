// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Barista Worker - Recommendation Advisor
//!
//! Standalone process that fulfils queued coffee recommendation requests:
//! - Scans `user_preferences` for pending records
//! - Calls the recommendation provider for each
//! - Writes the answer back for the API to pick up
//! - Optionally reclaims records abandoned by timed-out submitters

use std::sync::Arc;
use tracing::{info, warn};

use barista_worker::config::Config;
use barista_worker::provider::{HttpRecommendationProvider, RecommendationProvider};
use barista_worker::runtime::WorkerRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barista_worker=info,barista_core=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        provider_url = %config.provider_url,
        provider_timeout_secs = config.provider_timeout.as_secs(),
        poll_interval_ms = config.worker.poll_interval.as_millis() as u64,
        batch_size = config.worker.batch_size,
        reclaim_enabled = config.reclaim.enabled,
        "Starting Barista Worker"
    );

    let store = barista_core::persistence::connect(&config.database_url, 5).await?;
    info!("Connected to database");

    let provider = Arc::new(HttpRecommendationProvider::new(
        config.provider_url.clone(),
        config.provider_timeout,
    )?);
    info!(provider_type = provider.provider_type(), "Provider initialized");

    let runtime = WorkerRuntime::builder()
        .store(store)
        .provider(provider)
        .worker_config(config.worker.clone())
        .reclaim_config(config.reclaim.clone())
        .build()?
        .start()
        .await?;

    info!("Barista Worker ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    runtime.shutdown().await?;

    info!("Barista Worker shut down");

    Ok(())
}
