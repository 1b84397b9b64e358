// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock provider for testing.
//!
//! Answers from a script of queued responses, falling back to a default
//! behavior once the script is exhausted, and records every description it
//! was asked about.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::RecommendationProvider;
use crate::error::{Error, Result};

/// One scripted provider answer.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Succeed with this text.
    Text(String),
    /// Fail with this HTTP status.
    Status(u16),
}

/// Mock provider for testing.
pub struct MockProvider {
    script: Mutex<VecDeque<MockResponse>>,
    calls: Mutex<Vec<String>>,
    /// If true, unscripted calls fail with 503
    pub fail_by_default: bool,
    /// Optional delay to simulate a slow provider
    pub delay: Duration,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a mock provider that answers every call with [`MockProvider::default_answer`].
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fail_by_default: false,
            delay: Duration::ZERO,
        }
    }

    /// Create a mock provider that fails every unscripted call.
    pub fn failing() -> Self {
        Self {
            fail_by_default: true,
            ..Self::new()
        }
    }

    /// Create a mock provider that plays `responses` in order.
    pub fn scripted(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            ..Self::new()
        }
    }

    /// Set a per-call delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer used for unscripted calls.
    pub fn default_answer(description: &str) -> String {
        format!("Mock recommendation for {}", description)
    }

    /// Queue another scripted response.
    pub async fn push_response(&self, response: MockResponse) {
        self.script.lock().await.push_back(response);
    }

    /// Descriptions received so far, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl RecommendationProvider for MockProvider {
    fn provider_type(&self) -> &'static str {
        "mock"
    }

    async fn recommend(&self, description: &str) -> Result<String> {
        self.calls.lock().await.push(description.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.script.lock().await.pop_front();
        match scripted {
            Some(MockResponse::Text(text)) => Ok(text),
            Some(MockResponse::Status(status)) => Err(Error::UpstreamUnavailable {
                status,
                body: String::new(),
            }),
            None if self.fail_by_default => Err(Error::UpstreamUnavailable {
                status: 503,
                body: "mock provider failing".to_string(),
            }),
            None => Ok(Self::default_answer(description)),
        }
    }
}
