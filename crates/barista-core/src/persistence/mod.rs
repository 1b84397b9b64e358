//! Persistence interfaces and backends for the recommendation queue.
//!
//! The `user_preferences` table is the only channel between the API process
//! and the advisor worker. This module defines the contract both sides use
//! and the PostgreSQL and SQLite implementations of it.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::error::CoreError;
use crate::migrations;

/// Queue record from the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PreferenceRecord {
    /// Database primary key, assigned on insert.
    pub id: i64,
    /// Requesting user. Not unique.
    pub user_id: i64,
    /// Requested taste, e.g. "sweet".
    pub flavor: String,
    /// Requested strength, e.g. "mild".
    pub intensity: String,
    /// Requested milk, e.g. "oat".
    pub milk_preference: String,
    /// Recommendation text. Empty while pending.
    pub result_text: Option<String>,
    /// Always true once inserted.
    pub is_submitted: bool,
    /// Set exactly once by the worker, together with `result_text`.
    pub is_completed: bool,
    /// When the submitter inserted the record.
    pub created_at: DateTime<Utc>,
    /// When the worker completed the record.
    #[sqlx(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PreferenceRecord {
    /// Natural-language description of the preference sent to the provider.
    pub fn description(&self) -> String {
        format!(
            "Taste: {}, Intensity: {}, Milk Preference: {}",
            self.flavor, self.intensity, self.milk_preference
        )
    }
}

/// Fields supplied by the submitter when enqueuing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPreference {
    /// Requesting user.
    pub user_id: i64,
    /// Requested taste.
    pub flavor: String,
    /// Requested strength.
    pub intensity: String,
    /// Requested milk.
    pub milk_preference: String,
}

/// Queue-table operations shared by the submitter, the worker and the reclaim sweep.
///
/// No locking is exposed beyond single-row statements. `complete_preference`
/// must write `result_text` and `is_completed` in one statement so that no
/// reader observes the flag without the text.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Insert a pending record and return its assigned id.
    async fn insert_preference(&self, preference: &NewPreference) -> Result<i64, CoreError>;

    /// Read a single record by id.
    async fn get_preference(&self, id: i64) -> Result<Option<PreferenceRecord>, CoreError>;

    /// Records with `is_completed = false`, oldest first.
    async fn list_pending(&self, limit: i64) -> Result<Vec<PreferenceRecord>, CoreError>;

    /// Mark a pending record completed with its result text.
    ///
    /// Returns false if the record is missing or was already completed; the
    /// row is left untouched in that case.
    async fn complete_preference(&self, id: i64, result_text: &str) -> Result<bool, CoreError>;

    /// Delete a record by id. Returns false if nothing was deleted.
    async fn delete_preference(&self, id: i64) -> Result<bool, CoreError>;

    /// Whether the shop knows a user with this id.
    async fn user_exists(&self, user_id: i64) -> Result<bool, CoreError>;

    /// Number of records still waiting for the worker.
    async fn count_pending(&self) -> Result<i64, CoreError>;

    /// Ids of records created more than `max_age_secs` ago, oldest first.
    ///
    /// Used by the reclaim sweep for requests whose submitter gave up.
    async fn list_stale_preferences(
        &self,
        max_age_secs: i64,
        limit: i64,
    ) -> Result<Vec<i64>, CoreError>;

    /// Delete records by id. Returns the number of deleted rows.
    async fn delete_preferences_batch(&self, ids: &[i64]) -> Result<u64, CoreError>;

    /// Round-trip a trivial query.
    async fn health_check_db(&self) -> Result<bool, CoreError>;
}

/// Open the store named by `database_url` and bring its schema up to date.
///
/// URLs starting with `sqlite:` select [`SqliteStore`]; anything else is
/// handed to PostgreSQL.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
) -> Result<Arc<dyn PreferenceStore>, CoreError> {
    if database_url.starts_with("sqlite:") {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        migrations::run_sqlite(&pool).await?;
        info!(backend = "sqlite", "Queue store ready");
        Ok(Arc::new(SqliteStore::new(pool)))
    } else {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        migrations::run_postgres(&pool).await?;
        info!(backend = "postgres", "Queue store ready");
        Ok(Arc::new(PostgresStore::new(pool)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_format() {
        let record = PreferenceRecord {
            id: 1,
            user_id: 1,
            flavor: "sweet".to_string(),
            intensity: "mild".to_string(),
            milk_preference: "oat".to_string(),
            result_text: Some(String::new()),
            is_submitted: true,
            is_completed: false,
            created_at: Utc::now(),
            completed_at: None,
        };

        assert_eq!(
            record.description(),
            "Taste: sweet, Intensity: mild, Milk Preference: oat"
        );
    }

    #[tokio::test]
    async fn test_connect_sqlite_runs_migrations() {
        let temp_dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            temp_dir.path().join("queue.db").display()
        );

        let store = connect(&url, 1).await.unwrap();

        assert!(store.health_check_db().await.unwrap());
        assert_eq!(store.count_pending().await.unwrap(), 0);
    }
}
