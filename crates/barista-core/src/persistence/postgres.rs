// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL queue-table operations.
//!
//! Provides the free functions used by [`PostgresStore`] so that callers
//! holding only a pool (migrations tooling, tests) can reach the same queries.

use sqlx::PgPool;

use crate::error::CoreError;

use super::{NewPreference, PreferenceRecord, PreferenceStore};

/// PostgreSQL-backed queue store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new Postgres-backed store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ============================================================================
// Queue Operations
// ============================================================================

/// Insert a pending preference and return its id.
pub async fn insert_preference(
    pool: &PgPool,
    preference: &NewPreference,
) -> Result<i64, CoreError> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO user_preferences
            (user_id, flavor, intensity, milk_preference, result_text, is_submitted, is_completed, created_at)
        VALUES ($1, $2, $3, $4, '', TRUE, FALSE, NOW())
        RETURNING id
        "#,
    )
    .bind(preference.user_id)
    .bind(&preference.flavor)
    .bind(&preference.intensity)
    .bind(&preference.milk_preference)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Read one preference by id.
pub async fn get_preference(pool: &PgPool, id: i64) -> Result<Option<PreferenceRecord>, CoreError> {
    let record = sqlx::query_as::<_, PreferenceRecord>(
        r#"
        SELECT id, user_id, flavor, intensity, milk_preference, result_text,
               is_submitted, is_completed, created_at, completed_at
        FROM user_preferences
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Pending preferences, oldest first.
pub async fn list_pending(pool: &PgPool, limit: i64) -> Result<Vec<PreferenceRecord>, CoreError> {
    let records = sqlx::query_as::<_, PreferenceRecord>(
        r#"
        SELECT id, user_id, flavor, intensity, milk_preference, result_text,
               is_submitted, is_completed, created_at, completed_at
        FROM user_preferences
        WHERE is_completed = FALSE
        ORDER BY created_at ASC, id ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Write the result and the completion flag in one guarded statement.
pub async fn complete_preference(
    pool: &PgPool,
    id: i64,
    result_text: &str,
) -> Result<bool, CoreError> {
    let result = sqlx::query(
        r#"
        UPDATE user_preferences
        SET result_text = $1,
            is_completed = TRUE,
            completed_at = NOW()
        WHERE id = $2
          AND is_completed = FALSE
        "#,
    )
    .bind(result_text)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Delete one preference.
pub async fn delete_preference(pool: &PgPool, id: i64) -> Result<bool, CoreError> {
    let result = sqlx::query("DELETE FROM user_preferences WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Check the shop's user table.
pub async fn user_exists(pool: &PgPool, user_id: i64) -> Result<bool, CoreError> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

/// Count pending preferences.
pub async fn count_pending(pool: &PgPool) -> Result<i64, CoreError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM user_preferences WHERE is_completed = FALSE")
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Ids of preferences older than `max_age_secs`.
pub async fn list_stale_preferences(
    pool: &PgPool,
    max_age_secs: i64,
    limit: i64,
) -> Result<Vec<i64>, CoreError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT id
        FROM user_preferences
        WHERE created_at <= NOW() - make_interval(secs => $1)
        ORDER BY created_at ASC, id ASC
        LIMIT $2
        "#,
    )
    .bind(max_age_secs as f64)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Delete preferences by id.
pub async fn delete_preferences_batch(pool: &PgPool, ids: &[i64]) -> Result<u64, CoreError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM user_preferences WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[async_trait::async_trait]
impl PreferenceStore for PostgresStore {
    async fn insert_preference(&self, preference: &NewPreference) -> Result<i64, CoreError> {
        insert_preference(&self.pool, preference).await
    }

    async fn get_preference(&self, id: i64) -> Result<Option<PreferenceRecord>, CoreError> {
        get_preference(&self.pool, id).await
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<PreferenceRecord>, CoreError> {
        list_pending(&self.pool, limit).await
    }

    async fn complete_preference(&self, id: i64, result_text: &str) -> Result<bool, CoreError> {
        complete_preference(&self.pool, id, result_text).await
    }

    async fn delete_preference(&self, id: i64) -> Result<bool, CoreError> {
        delete_preference(&self.pool, id).await
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, CoreError> {
        user_exists(&self.pool, user_id).await
    }

    async fn count_pending(&self) -> Result<i64, CoreError> {
        count_pending(&self.pool).await
    }

    async fn list_stale_preferences(
        &self,
        max_age_secs: i64,
        limit: i64,
    ) -> Result<Vec<i64>, CoreError> {
        list_stale_preferences(&self.pool, max_age_secs, limit).await
    }

    async fn delete_preferences_batch(&self, ids: &[i64]) -> Result<u64, CoreError> {
        delete_preferences_batch(&self.pool, ids).await
    }

    async fn health_check_db(&self) -> Result<bool, CoreError> {
        let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}
