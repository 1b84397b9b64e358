// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request submitter: the API side of the recommendation hand-off.
//!
//! A submission inserts one pending queue record, then polls that record by
//! id until the advisor worker marks it completed or the [`RetryPolicy`]
//! budget runs out.
//!
//! ```text
//!   submit()
//!     │ validate, check user
//!     ▼
//!   insert ──► get_preference(id) ──► completed? ──yes──► delete ──► Ok(text)
//!                    ▲      │
//!                    │      ├── missing ────────────────────────────► RecordVanished
//!                    │      ▼
//!                    │   attempts >= max? ──yes─────────────────────► RequestTimedOut
//!                    │      │ no
//!                    └── wait poll_interval (or completion notify)
//! ```
//!
//! The submitter never updates a record. It deletes only the record it
//! inserted, and only after reading it back with `is_completed = true`.
//! A timed-out record is left for the reclaim sweep.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::{debug, info, instrument, warn};

use crate::error::{CoreError, Result};
use crate::persistence::{NewPreference, PreferenceStore};

/// Poll budget for a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pending observations tolerated before giving up.
    pub max_attempts: u32,
    /// Wait between two reads of the queue record.
    pub poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with an explicit budget.
    pub fn new(max_attempts: u32, poll_interval: Duration) -> Self {
        Self {
            max_attempts,
            poll_interval,
        }
    }

    /// Upper bound on time spent waiting (excluding store round-trips).
    pub fn total_wait(&self) -> Duration {
        self.poll_interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }
}

/// Inbound preference payload.
///
/// Text fields are optional on the wire so that missing and empty values
/// produce the same validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    /// Requesting user.
    pub user_id: i64,
    /// Requested taste.
    #[serde(default)]
    pub flavor: Option<String>,
    /// Requested strength.
    #[serde(default)]
    pub intensity: Option<String>,
    /// Requested milk.
    #[serde(default)]
    pub milk_preference: Option<String>,
}

impl RecommendationRequest {
    /// Build a request from plain values.
    pub fn new(
        user_id: i64,
        flavor: impl Into<String>,
        intensity: impl Into<String>,
        milk_preference: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            flavor: Some(flavor.into()),
            intensity: Some(intensity.into()),
            milk_preference: Some(milk_preference.into()),
        }
    }

    /// Check required fields and produce the record to enqueue.
    pub fn validate(&self) -> Result<NewPreference> {
        Ok(NewPreference {
            user_id: self.user_id,
            flavor: required("flavor", self.flavor.as_deref())?,
            intensity: required("intensity", self.intensity.as_deref())?,
            milk_preference: required("milk_preference", self.milk_preference.as_deref())?,
        })
    }
}

fn required(field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CoreError::validation(field, "must not be empty")),
    }
}

/// Turns a preference into a recommendation by way of the shared queue table.
#[derive(Clone)]
pub struct RecommendationSubmitter {
    store: Arc<dyn PreferenceStore>,
    policy: RetryPolicy,
    completion: Option<Arc<Notify>>,
}

impl RecommendationSubmitter {
    /// Create a submitter over `store` with the given poll budget.
    pub fn new(store: Arc<dyn PreferenceStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            completion: None,
        }
    }

    /// Wake waiting submissions early when `notify` fires.
    ///
    /// Only meaningful when the worker runs in the same process and shares
    /// the handle. The poll budget is unchanged; a notification just
    /// triggers the next read immediately.
    pub fn with_completion_notify(mut self, notify: Arc<Notify>) -> Self {
        self.completion = Some(notify);
        self
    }

    /// The poll budget in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Submit a preference and wait for its recommendation.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if a text field is missing or blank (nothing is inserted)
    /// - `UserNotFound` if the user does not exist (nothing is inserted)
    /// - `RequestTimedOut` if the worker did not complete the record in time
    /// - `RecordVanished` if the record disappeared while waiting
    /// - `DatabaseError` on store failures
    #[instrument(skip(self, request), fields(user_id = request.user_id))]
    pub async fn submit(&self, request: &RecommendationRequest) -> Result<String> {
        let preference = request.validate().inspect_err(|e| {
            warn!(error = %e, "Rejected recommendation request");
        })?;

        if !self.store.user_exists(preference.user_id).await? {
            warn!("User not found");
            return Err(CoreError::UserNotFound {
                user_id: preference.user_id,
            });
        }

        let request_id = self.store.insert_preference(&preference).await?;
        info!(request_id, "Recommendation request queued");

        self.wait_for_completion(request_id).await
    }

    /// Poll an already-queued record until it completes or the budget ends.
    ///
    /// On completion the record is deleted and its result text returned.
    pub async fn wait_for_completion(&self, request_id: i64) -> Result<String> {
        let mut attempts: u32 = 0;

        loop {
            // Register for the wake-up before reading, so a completion that
            // lands between the read and the wait is not lost.
            let notified = self.completion.as_deref().map(Notify::notified);
            tokio::pin!(notified);
            if let Some(notified) = notified.as_mut().as_pin_mut() {
                notified.enable();
            }

            let Some(record) = self.store.get_preference(request_id).await? else {
                warn!(request_id, attempts, "Queue record disappeared before completion");
                return Err(CoreError::RecordVanished { request_id });
            };

            if record.is_completed {
                let text = record.result_text.unwrap_or_default();

                if self.store.delete_preference(request_id).await? {
                    debug!(request_id, "Queue record deleted");
                } else {
                    warn!(request_id, "Queue record already removed after completion");
                }

                info!(request_id, attempts, "Recommendation received");
                return Ok(text);
            }

            if attempts >= self.policy.max_attempts {
                warn!(
                    request_id,
                    attempts, "Recommendation worker did not respond within the poll budget"
                );
                return Err(CoreError::RequestTimedOut {
                    request_id,
                    attempts,
                });
            }

            attempts += 1;
            debug!(request_id, attempt = attempts, "Recommendation still pending");
            self.pause(notified).await;
        }
    }

    async fn pause(&self, notified: Pin<&mut Option<Notified<'_>>>) {
        match notified.as_pin_mut() {
            Some(notified) => {
                tokio::select! {
                    _ = notified => {}
                    _ = tokio::time::sleep(self.policy.poll_interval) => {}
                }
            }
            None => tokio::time::sleep(self.policy.poll_interval).await,
        }
    }
}
