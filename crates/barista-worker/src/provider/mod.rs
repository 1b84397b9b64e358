// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recommendation providers.
//!
//! A provider turns a preference description into recommendation text. The
//! worker treats every provider as an opaque, possibly slow, possibly
//! failing remote call; anything but a successful answer leaves the queue
//! record pending.

pub mod http;
pub mod mock;

pub use self::http::HttpRecommendationProvider;
pub use self::mock::MockProvider;

use async_trait::async_trait;

use crate::error::Result;

/// Prefix placed in front of every description sent to a provider.
pub const QUERY_PREFIX: &str = "Recommend coffee with the following descriptions: ";

/// Build the natural-language query for a preference description.
pub fn build_query(description: &str) -> String {
    format!("{}{}", QUERY_PREFIX, description)
}

/// Source of recommendation text.
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    /// Short name used in logs.
    fn provider_type(&self) -> &'static str;

    /// Ask for a recommendation for `description`.
    ///
    /// Returns the provider's answer verbatim on success.
    async fn recommend(&self, description: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query() {
        assert_eq!(
            build_query("Taste: sweet, Intensity: mild, Milk Preference: oat"),
            "Recommend coffee with the following descriptions: Taste: sweet, Intensity: mild, Milk Preference: oat"
        );
    }
}
