// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Barista Worker - Recommendation Advisor
//!
//! The background half of the recommendation hand-off. It never talks to
//! the API process directly; it reads pending records from the shared
//! `user_preferences` table, asks a [`provider::RecommendationProvider`]
//! for each, and writes the answer back with the completion flag set.
//!
//! ```text
//!   ┌──────────── every poll_interval ────────────┐
//!   │                                             │
//!   ▼                                             │
//! list_pending ──► for each record (oldest first) │
//!                    │                            │
//!                    ├─ provider.recommend ──err──┼─► log, leave pending
//!                    │        │ ok                │
//!                    │        ▼                   │
//!                    └─ complete_preference ──────┘
//! ```
//!
//! An optional [`reclaim_worker::ReclaimWorker`] deletes records left behind
//! by submitters that gave up waiting.

#![deny(missing_docs)]

/// Worker configuration loaded from environment variables.
pub mod config;

/// Error types for worker operations.
pub mod error;

/// Recommendation providers (HTTP endpoint, mock).
pub mod provider;

/// Background sweep for abandoned queue records.
pub mod reclaim_worker;

/// Queue scan loop that fulfils pending requests.
pub mod recommendation_worker;

/// Embeddable runtime for barista-worker.
pub mod runtime;

pub use config::Config;
pub use error::Error;
