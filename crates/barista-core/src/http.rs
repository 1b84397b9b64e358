// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP surface for the recommendation submitter.
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `POST` | `/api/coffee-recommendation` | Submit preferences, wait for the recommendation |
//! | `GET`  | `/health` | Store round-trip and pending queue depth |
//!
//! Errors are rendered as `{"statusCode", "code", "message"}` with the status
//! taken from [`ApiError::status`].

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::CoreError;
use crate::persistence::PreferenceStore;
use crate::submitter::{RecommendationRequest, RecommendationSubmitter};

/// Shared state for the HTTP handlers.
pub struct ApiState {
    /// Submitter used by the recommendation endpoint.
    pub submitter: RecommendationSubmitter,
    /// Store used by the health endpoint.
    pub store: Arc<dyn PreferenceStore>,
}

impl ApiState {
    /// Create state from a store and a ready submitter.
    pub fn new(store: Arc<dyn PreferenceStore>, submitter: RecommendationSubmitter) -> Self {
        Self { submitter, store }
    }
}

/// Error body returned to HTTP callers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Mirrors the response status.
    pub status_code: u16,
    /// Stable error code from [`CoreError::error_code`].
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

/// A [`CoreError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CoreError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            CoreError::UserNotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::RequestTimedOut { .. } | CoreError::RecordVanished { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
            "Internal server error. Please try again later.".to_string()
        } else {
            self.0.to_string()
        };

        let body = ErrorBody {
            status_code: status.as_u16(),
            code: self.0.error_code(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Health response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: &'static str,
    /// Whether the store answered.
    pub database: bool,
    /// Queue depth, when the store answered.
    pub pending_requests: Option<i64>,
}

/// Build the API router.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/coffee-recommendation", post(recommend_coffee))
        .route("/health", get(health))
        .with_state(state)
}

async fn recommend_coffee(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Malformed recommendation request");
        CoreError::validation("body", rejection.body_text())
    })?;

    Ok(state.submitter.submit(&request).await?)
}

async fn health(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<HealthResponse>) {
    let database = match state.store.health_check_db().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "Health check failed");
            false
        }
    };

    let pending_requests = if database {
        state.store.count_pending().await.ok()
    } else {
        None
    };

    let (status_code, status) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            database,
            pending_requests,
        }),
    )
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: Arc<ApiState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
