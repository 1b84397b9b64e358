// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for barista-worker.

use std::time::Duration;

use barista_core::RetryPolicy;

use crate::reclaim_worker::ReclaimWorkerConfig;
use crate::recommendation_worker::RecommendationWorkerConfig;

/// Default recommendation endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://free-unoficial-gpt4o-mini-api-g70n.onrender.com/chat/";

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Queue database URL (PostgreSQL or SQLite)
    pub database_url: String,
    /// Base URL of the recommendation provider
    pub provider_url: String,
    /// Per-request provider timeout
    pub provider_timeout: Duration,
    /// Scan loop settings
    pub worker: RecommendationWorkerConfig,
    /// Reclaim sweep settings
    pub reclaim: ReclaimWorkerConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `BARISTA_WORKER_DATABASE_URL` or `BARISTA_DATABASE_URL`
    ///
    /// Optional (with defaults):
    /// - `BARISTA_PROVIDER_URL`: provider base URL (default: [`DEFAULT_PROVIDER_URL`])
    /// - `BARISTA_PROVIDER_TIMEOUT_SECS`: per-request timeout (default: 30)
    /// - scan settings, see [`RecommendationWorkerConfig::from_env`]
    /// - sweep settings, see [`ReclaimWorkerConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("BARISTA_WORKER_DATABASE_URL")
            .or_else(|_| std::env::var("BARISTA_DATABASE_URL"))
            .map_err(|_| {
                ConfigError::MissingEnvVar("BARISTA_WORKER_DATABASE_URL or BARISTA_DATABASE_URL")
            })?;

        let provider_url = std::env::var("BARISTA_PROVIDER_URL")
            .unwrap_or_else(|_| DEFAULT_PROVIDER_URL.to_string());

        let provider_timeout_secs: u64 = std::env::var("BARISTA_PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("BARISTA_PROVIDER_TIMEOUT_SECS"))?;

        let config = Self {
            database_url,
            provider_url,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            worker: RecommendationWorkerConfig::from_env(),
            reclaim: ReclaimWorkerConfig::from_env(),
        };

        config.check_reclaim_age(submitter_policy_from_env())?;

        Ok(config)
    }

    /// Reject a reclaim age that could delete records a submitter is still polling.
    pub fn check_reclaim_age(&self, submitter: RetryPolicy) -> Result<(), ConfigError> {
        self.reclaim.check_against(submitter)
    }
}

/// The API's poll budget, read from the variables the API process uses.
fn submitter_policy_from_env() -> RetryPolicy {
    let defaults = RetryPolicy::default();

    let max_attempts = std::env::var("BARISTA_POLL_MAX_ATTEMPTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.max_attempts);

    let poll_interval = std::env::var("BARISTA_POLL_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(defaults.poll_interval);

    RetryPolicy::new(max_attempts, poll_interval)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// An environment variable could not be parsed.
    #[error("Invalid value for {0}")]
    Invalid(&'static str),

    /// The reclaim sweep would race the submitter.
    #[error(
        "BARISTA_RECLAIM_MAX_AGE_SECS ({max_age_secs}s) must exceed the submitter wait budget ({budget_secs}s)"
    )]
    ReclaimTooEager {
        /// Configured reclaim age.
        max_age_secs: u64,
        /// Submitter's total wait.
        budget_secs: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "BARISTA_WORKER_DATABASE_URL",
        "BARISTA_DATABASE_URL",
        "BARISTA_PROVIDER_URL",
        "BARISTA_PROVIDER_TIMEOUT_SECS",
        "BARISTA_WORKER_POLL_INTERVAL_MS",
        "BARISTA_WORKER_BATCH_SIZE",
        "BARISTA_RECLAIM_ENABLED",
        "BARISTA_RECLAIM_POLL_INTERVAL_SECS",
        "BARISTA_RECLAIM_MAX_AGE_SECS",
        "BARISTA_RECLAIM_BATCH_SIZE",
        "BARISTA_POLL_MAX_ATTEMPTS",
        "BARISTA_POLL_INTERVAL_MS",
    ];

    /// Clears every worker variable and restores them on drop.
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn clean() -> Self {
            let saved = VARS.iter().map(|k| (*k, env::var(k).ok())).collect();
            for key in VARS {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe { env::remove_var(key) };
            }
            Self { saved }
        }

        fn set(&self, key: &str, value: &str) {
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(key, v),
                        None => env::remove_var(key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::clean();
        guard.set("BARISTA_DATABASE_URL", "sqlite::memory:");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.provider_url, DEFAULT_PROVIDER_URL);
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.worker.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.worker.batch_size, 50);
        assert!(!config.reclaim.enabled);
    }

    #[test]
    fn test_worker_database_url_takes_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::clean();
        guard.set("BARISTA_DATABASE_URL", "postgres://shared");
        guard.set("BARISTA_WORKER_DATABASE_URL", "postgres://worker");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "postgres://worker");
    }

    #[test]
    fn test_missing_database_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _guard = EnvGuard::clean();

        let result = Config::from_env();

        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_invalid_provider_timeout() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::clean();
        guard.set("BARISTA_DATABASE_URL", "sqlite::memory:");
        guard.set("BARISTA_PROVIDER_TIMEOUT_SECS", "soon");

        let result = Config::from_env();

        assert!(matches!(
            result,
            Err(ConfigError::Invalid("BARISTA_PROVIDER_TIMEOUT_SECS"))
        ));
    }

    #[test]
    fn test_custom_worker_and_reclaim_settings() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::clean();
        guard.set("BARISTA_DATABASE_URL", "sqlite::memory:");
        guard.set("BARISTA_PROVIDER_URL", "http://localhost:9000/chat/");
        guard.set("BARISTA_WORKER_POLL_INTERVAL_MS", "250");
        guard.set("BARISTA_WORKER_BATCH_SIZE", "5");
        guard.set("BARISTA_RECLAIM_ENABLED", "1");
        guard.set("BARISTA_RECLAIM_MAX_AGE_SECS", "120");

        let config = Config::from_env().unwrap();

        assert_eq!(config.provider_url, "http://localhost:9000/chat/");
        assert_eq!(config.worker.poll_interval, Duration::from_millis(250));
        assert_eq!(config.worker.batch_size, 5);
        assert!(config.reclaim.enabled);
        assert_eq!(config.reclaim.max_age, Duration::from_secs(120));
    }

    #[test]
    fn test_reclaim_age_must_exceed_submitter_budget() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::clean();
        guard.set("BARISTA_DATABASE_URL", "sqlite::memory:");
        guard.set("BARISTA_RECLAIM_ENABLED", "true");
        guard.set("BARISTA_RECLAIM_MAX_AGE_SECS", "20");
        guard.set("BARISTA_POLL_MAX_ATTEMPTS", "10");
        guard.set("BARISTA_POLL_INTERVAL_MS", "3000");

        let result = Config::from_env();

        assert!(matches!(
            result,
            Err(ConfigError::ReclaimTooEager {
                max_age_secs: 20,
                budget_secs: 30
            })
        ));
    }

    #[test]
    fn test_short_reclaim_age_allowed_when_disabled() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::clean();
        guard.set("BARISTA_DATABASE_URL", "sqlite::memory:");
        guard.set("BARISTA_RECLAIM_MAX_AGE_SECS", "1");

        assert!(Config::from_env().is_ok());
    }

    #[test]
    fn test_huge_poll_budget_is_rejected_without_overflow() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::clean();
        guard.set("BARISTA_DATABASE_URL", "sqlite::memory:");
        guard.set("BARISTA_RECLAIM_ENABLED", "true");
        guard.set("BARISTA_POLL_MAX_ATTEMPTS", "4294967295");
        guard.set("BARISTA_POLL_INTERVAL_MS", "18446744073709551615");

        let result = Config::from_env();

        assert!(matches!(
            result,
            Err(ConfigError::ReclaimTooEager {
                max_age_secs: 3600,
                budget_secs: u64::MAX
            })
        ));
    }
}
