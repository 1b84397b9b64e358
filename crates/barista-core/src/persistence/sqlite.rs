//! SQLite-backed queue store.

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::CoreError;
use crate::migrations;

use super::{NewPreference, PreferenceRecord, PreferenceStore};

/// SQLite-backed queue store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create and initialize a SQLite store from a file path.
    ///
    /// Creates parent directories and the database file if needed, connects,
    /// and runs all migrations.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = SqliteStore::from_path(".data/barista.db").await?;
    /// ```
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::DatabaseError {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {:?}: {}", path, e),
            })?;

        migrations::SQLITE.run(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl PreferenceStore for SqliteStore {
    async fn insert_preference(&self, preference: &NewPreference) -> Result<i64, CoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_preferences
                (user_id, flavor, intensity, milk_preference, result_text, is_submitted, is_completed, created_at)
            VALUES (?, ?, ?, ?, '', 1, 0, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(preference.user_id)
        .bind(&preference.flavor)
        .bind(&preference.intensity)
        .bind(&preference.milk_preference)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_preference(&self, id: i64) -> Result<Option<PreferenceRecord>, CoreError> {
        let record = sqlx::query_as::<_, PreferenceRecord>(
            r#"
            SELECT id, user_id, flavor, intensity, milk_preference, result_text,
                   is_submitted, is_completed, created_at, completed_at
            FROM user_preferences
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<PreferenceRecord>, CoreError> {
        let records = sqlx::query_as::<_, PreferenceRecord>(
            r#"
            SELECT id, user_id, flavor, intensity, milk_preference, result_text,
                   is_submitted, is_completed, created_at, completed_at
            FROM user_preferences
            WHERE is_completed = 0
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn complete_preference(&self, id: i64, result_text: &str) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE user_preferences
            SET result_text = ?1,
                is_completed = 1,
                completed_at = CURRENT_TIMESTAMP
            WHERE id = ?2
              AND is_completed = 0
            "#,
        )
        .bind(result_text)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_preference(&self, id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM user_preferences WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, CoreError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn count_pending(&self) -> Result<i64, CoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_preferences WHERE is_completed = 0")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn list_stale_preferences(
        &self,
        max_age_secs: i64,
        limit: i64,
    ) -> Result<Vec<i64>, CoreError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM user_preferences
            WHERE created_at <= datetime('now', '-' || ? || ' seconds')
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(max_age_secs)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn delete_preferences_batch(&self, ids: &[i64]) -> Result<u64, CoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM user_preferences WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    async fn health_check_db(&self) -> Result<bool, CoreError> {
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}
