// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for barista-worker integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use barista_core::migrations;
use barista_core::persistence::{NewPreference, PreferenceStore, SqliteStore};

/// Create a migrated in-memory SQLite store with users 1 and 2.
pub async fn sqlite_store() -> (Arc<SqliteStore>, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    migrations::run_sqlite(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query("INSERT INTO users (id, name) VALUES (1, 'Ada'), (2, 'Grace')")
        .execute(&pool)
        .await
        .expect("Failed to seed users");

    (Arc::new(SqliteStore::new(pool.clone())), pool)
}

/// Insert a pending request for user 1.
pub async fn enqueue(store: &dyn PreferenceStore, flavor: &str, intensity: &str, milk: &str) -> i64 {
    store
        .insert_preference(&NewPreference {
            user_id: 1,
            flavor: flavor.to_string(),
            intensity: intensity.to_string(),
            milk_preference: milk.to_string(),
        })
        .await
        .expect("Failed to enqueue request")
}

/// Move a record's creation time into the past (SQLite datetime modifier, e.g. "-2 hours").
pub async fn backdate(pool: &SqlitePool, id: i64, modifier: &str) {
    sqlx::query("UPDATE user_preferences SET created_at = datetime('now', ?) WHERE id = ?")
        .bind(modifier)
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to backdate request");
}
