// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use crate::submitter::RetryPolicy;

/// Barista API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL or SQLite connection URL
    pub database_url: String,
    /// HTTP server address for the recommendation endpoint
    pub http_addr: SocketAddr,
    /// Poll budget used by the request submitter
    pub retry_policy: RetryPolicy,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `BARISTA_DATABASE_URL`: PostgreSQL or SQLite connection string
    ///
    /// Optional (with defaults):
    /// - `BARISTA_HTTP_PORT`: HTTP server port (default: 8080)
    /// - `BARISTA_POLL_MAX_ATTEMPTS`: pending polls before giving up (default: 10)
    /// - `BARISTA_POLL_INTERVAL_MS`: wait between polls (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("BARISTA_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("BARISTA_DATABASE_URL"))?;

        let http_port: u16 = std::env::var("BARISTA_HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("BARISTA_HTTP_PORT", "must be a valid port number")
            })?;

        let max_attempts: u32 = std::env::var("BARISTA_POLL_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("BARISTA_POLL_MAX_ATTEMPTS", "must be a positive integer")
            })?;

        let poll_interval_ms: u64 = std::env::var("BARISTA_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("BARISTA_POLL_INTERVAL_MS", "must be a positive integer")
            })?;

        if max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "BARISTA_POLL_MAX_ATTEMPTS",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            database_url,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            retry_policy: RetryPolicy::new(max_attempts, Duration::from_millis(poll_interval_ms)),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
