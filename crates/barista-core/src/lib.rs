// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Barista Core - Recommendation Queue and Submitter
//!
//! This crate owns the `user_preferences` queue table that connects the
//! coffee-shop API to the advisor worker, plus the API-side logic that turns
//! one HTTP request into one queued record and waits for its answer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                        ┌──────────────────────┐
//! │   barista-api        │                        │   barista-worker     │
//! │   (This Crate)       │                        │   (advisor loop)     │
//! │                      │                        │                      │
//! │ POST /api/coffee-    │                        │ list_pending         │
//! │   recommendation     │                        │ provider.recommend   │
//! │ insert + poll + del  │                        │ complete_preference  │
//! └──────────┬───────────┘                        └──────────┬───────────┘
//!            │                                               │
//!            ▼                                               ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 user_preferences (PostgreSQL / SQLite)               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two processes never talk directly. Each record goes through
//! three states:
//!
//! | State | Written by | Meaning |
//! |-------|------------|---------|
//! | pending | submitter (insert) | `is_completed = false`, empty `result_text` |
//! | completed | worker (single guarded update) | `result_text` set, `is_completed = true` |
//! | removed | submitter (delete) or reclaim sweep | row gone |
//!
//! # Modules
//!
//! - [`persistence`]: the [`PreferenceStore`](persistence::PreferenceStore)
//!   contract with PostgreSQL and SQLite backends
//! - [`submitter`]: validation, enqueue, bounded polling
//! - [`http`]: axum router (feature `http`)
//! - [`config`]: environment configuration for the API binary

#![deny(missing_docs)]

/// API configuration loaded from environment variables.
pub mod config;

/// Error types with stable codes for the HTTP boundary.
pub mod error;

/// HTTP router for the recommendation endpoint.
#[cfg(feature = "http")]
pub mod http;

/// Embedded schema migrations for both backends.
pub mod migrations;

/// Queue-table contract and database backends.
pub mod persistence;

/// Request validation, enqueue and bounded polling.
pub mod submitter;

pub use error::{CoreError, Result};
pub use persistence::{NewPreference, PreferenceRecord, PreferenceStore};
pub use submitter::{RecommendationRequest, RecommendationSubmitter, RetryPolicy};
