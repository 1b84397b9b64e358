// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for barista-worker.

use thiserror::Error;

/// Worker errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Queue store operation failed.
    #[error("Store error: {0}")]
    Core(#[from] barista_core::CoreError),

    /// The provider could not be reached or timed out.
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Provider unavailable: HTTP {status}: {body}")]
    UpstreamUnavailable {
        /// Response status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
}

impl Error {
    /// Whether the failure came from the recommendation provider.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Http(_) | Self::UpstreamUnavailable { .. })
    }
}

/// Result type using worker Error.
pub type Result<T> = std::result::Result<T, Error>;
