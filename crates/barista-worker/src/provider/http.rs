// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP recommendation provider.
//!
//! Issues `GET {base_url}?query={url-encoded query}` and returns the body of
//! a 2xx response as the recommendation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{RecommendationProvider, build_query};
use crate::error::{Error, Result};

/// Provider backed by a text-generation HTTP endpoint.
pub struct HttpRecommendationProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRecommendationProvider {
    /// Create a provider for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// The endpoint this provider calls.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL for a description.
    pub fn request_url(&self, description: &str) -> String {
        let query = urlencoding::encode(&build_query(description)).into_owned();
        if self.base_url.contains('?') {
            format!("{}&query={}", self.base_url, query)
        } else {
            format!("{}?query={}", self.base_url, query)
        }
    }
}

#[async_trait]
impl RecommendationProvider for HttpRecommendationProvider {
    fn provider_type(&self) -> &'static str {
        "http"
    }

    async fn recommend(&self, description: &str) -> Result<String> {
        let url = self.request_url(description);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        debug!(status = status.as_u16(), "Provider responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamUnavailable {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}
