// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for barista-core.
//!
//! Provides a unified error type with stable error codes that the HTTP
//! boundary maps to status codes.

use std::fmt;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur while submitting or storing recommendation requests.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// Input validation failed. No queue record was created.
    ValidationError {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// The requesting user does not exist. No queue record was created.
    UserNotFound {
        /// The user ID that was not found.
        user_id: i64,
    },

    /// The poll budget ran out before the worker completed the request.
    ///
    /// The queue record is left in place for the reclaim sweep.
    RequestTimedOut {
        /// The queue record the submitter was waiting on.
        request_id: i64,
        /// Number of polls that observed the record still pending.
        attempts: u32,
    },

    /// The queue record disappeared before it was observed as completed.
    RecordVanished {
        /// The queue record that went missing.
        request_id: i64,
    },

    /// Database operation failed.
    DatabaseError {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl CoreError {
    /// Shorthand for a validation error on `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::UserNotFound { .. } => "USER_NOT_FOUND",
            Self::RequestTimedOut { .. } => "REQUEST_TIMED_OUT",
            Self::RecordVanished { .. } => "RECORD_VANISHED",
            Self::DatabaseError { .. } => "DATABASE_ERROR",
        }
    }

    /// Whether this error means "no recommendation right now" rather than a
    /// caller mistake or an infrastructure failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimedOut { .. } | Self::RecordVanished { .. }
        )
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError { field, message } => {
                write!(f, "Validation error for '{}': {}", field, message)
            }
            Self::UserNotFound { user_id } => {
                write!(f, "User with ID {} not found", user_id)
            }
            Self::RequestTimedOut {
                request_id,
                attempts,
            } => {
                write!(
                    f,
                    "Recommendation unavailable: request {} still pending after {} attempts",
                    request_id, attempts
                )
            }
            Self::RecordVanished { request_id } => {
                write!(
                    f,
                    "Recommendation unavailable: request {} disappeared before completion",
                    request_id
                )
            }
            Self::DatabaseError { operation, details } => {
                write!(f, "Database error during '{}': {}", operation, details)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::DatabaseError {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for CoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CoreError::DatabaseError {
            operation: "migrate".to_string(),
            details: err.to_string(),
        }
    }
}
