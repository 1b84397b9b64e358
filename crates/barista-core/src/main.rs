// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Barista API - coffee recommendation endpoint
//!
//! Accepts preferences over HTTP, queues them in `user_preferences`, and
//! waits for barista-worker to fill in the recommendation.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use barista_core::config::Config;
use barista_core::http::{self, ApiState};
use barista_core::persistence;
use barista_core::submitter::RecommendationSubmitter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("barista_core=info".parse()?),
        )
        .init();

    info!("Starting Barista API");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        http_addr = %config.http_addr,
        max_attempts = config.retry_policy.max_attempts,
        poll_interval_ms = config.retry_policy.poll_interval.as_millis() as u64,
        "Configuration loaded"
    );

    info!("Connecting to database...");
    let store = persistence::connect(&config.database_url, 10).await?;

    if !store.health_check_db().await? {
        anyhow::bail!("Database health check failed");
    }
    info!("Database health check passed");

    let submitter = RecommendationSubmitter::new(store.clone(), config.retry_policy);
    let state = Arc::new(ApiState::new(store, submitter));

    http::serve(config.http_addr, state, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down...");
}
