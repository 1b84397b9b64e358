// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for barista-core integration tests.
//!
//! Provides a migrated in-memory SQLite store with seeded users, an optional
//! PostgreSQL store from `TEST_BARISTA_DATABASE_URL`, and a stand-in worker
//! that completes pending records the way barista-worker does.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use barista_core::persistence::{PostgresStore, PreferenceStore, SqliteStore};
use barista_core::{RetryPolicy, migrations};

/// Users present in every SQLite test store.
pub const SEEDED_USERS: &[(i64, &str)] = &[(1, "Ada"), (2, "Grace")];

/// Create a migrated in-memory SQLite store with [`SEEDED_USERS`].
pub async fn sqlite_store() -> (Arc<SqliteStore>, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    migrations::run_sqlite(&pool)
        .await
        .expect("Failed to run migrations");

    for (id, name) in SEEDED_USERS {
        sqlx::query("INSERT INTO users (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(&pool)
            .await
            .expect("Failed to seed user");
    }

    (Arc::new(SqliteStore::new(pool.clone())), pool)
}

/// Connect to the PostgreSQL test database, if one is configured.
///
/// Returns None (and the calling test should return early) when
/// `TEST_BARISTA_DATABASE_URL` is unset.
pub async fn postgres_store() -> Option<Arc<PostgresStore>> {
    let database_url = std::env::var("TEST_BARISTA_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .ok()?;

    migrations::run_postgres(&pool).await.ok()?;

    Some(Arc::new(PostgresStore::new(pool)))
}

/// Short poll budget for tests.
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(20))
}

/// Result text the stand-in worker writes for a record.
pub fn canned_answer(description: &str) -> String {
    format!("Recommended for [{}]", description)
}

/// Spawn a stand-in worker that completes every pending record with
/// [`canned_answer`] and fires `notify` after each completion.
pub fn spawn_fake_worker(
    store: Arc<dyn PreferenceStore>,
    notify: Option<Arc<Notify>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(pending) = store.list_pending(50).await {
                for record in pending {
                    let answer = canned_answer(&record.description());
                    let completed = matches!(
                        store.complete_preference(record.id, &answer).await,
                        Ok(true)
                    );
                    if completed {
                        if let Some(notify) = &notify {
                            notify.notify_waiters();
                        }
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
}
