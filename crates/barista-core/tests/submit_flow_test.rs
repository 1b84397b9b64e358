// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end submitter flows against a live store and a stand-in worker.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use barista_core::persistence::PreferenceStore;
use barista_core::{CoreError, RecommendationRequest, RecommendationSubmitter, RetryPolicy};

use common::{canned_answer, fast_policy, spawn_fake_worker, sqlite_store};

#[tokio::test]
async fn test_submit_returns_worker_answer_and_cleans_up() {
    let (store, _pool) = sqlite_store().await;
    let worker = spawn_fake_worker(store.clone(), None);
    let submitter = RecommendationSubmitter::new(store.clone(), fast_policy(50));

    let text = submitter
        .submit(&RecommendationRequest::new(1, "bold", "strong", "none"))
        .await
        .unwrap();

    assert_eq!(
        text,
        canned_answer("Taste: bold, Intensity: strong, Milk Preference: none")
    );
    assert_eq!(store.count_pending().await.unwrap(), 0);
    assert!(store.list_pending(10).await.unwrap().is_empty());

    worker.abort();
}

#[tokio::test]
async fn test_same_user_concurrent_requests_get_their_own_answers() {
    let (store, _pool) = sqlite_store().await;
    let worker = spawn_fake_worker(store.clone(), None);
    let submitter = RecommendationSubmitter::new(store.clone(), fast_policy(100));

    let first = {
        let submitter = submitter.clone();
        tokio::spawn(async move {
            submitter
                .submit(&RecommendationRequest::new(1, "sweet", "mild", "oat"))
                .await
        })
    };
    let second = {
        let submitter = submitter.clone();
        tokio::spawn(async move {
            submitter
                .submit(&RecommendationRequest::new(1, "nutty", "medium", "whole"))
                .await
        })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(
        first,
        canned_answer("Taste: sweet, Intensity: mild, Milk Preference: oat")
    );
    assert_eq!(
        second,
        canned_answer("Taste: nutty, Intensity: medium, Milk Preference: whole")
    );

    worker.abort();
}

#[tokio::test]
async fn test_no_worker_times_out_and_leaves_record() {
    let (store, _pool) = sqlite_store().await;
    let submitter = RecommendationSubmitter::new(store.clone(), fast_policy(2));

    let err = submitter
        .submit(&RecommendationRequest::new(2, "fruity", "light", "almond"))
        .await
        .unwrap_err();

    assert!(err.is_unavailable());
    assert_eq!(err.error_code(), "REQUEST_TIMED_OUT");
    assert_eq!(store.count_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn test_late_worker_still_completes_orphan() {
    let (store, _pool) = sqlite_store().await;
    let submitter = RecommendationSubmitter::new(store.clone(), fast_policy(1));

    let request_id = match submitter
        .submit(&RecommendationRequest::new(1, "bold", "strong", "none"))
        .await
    {
        Err(CoreError::RequestTimedOut { request_id, .. }) => request_id,
        other => panic!("expected timeout, got {:?}", other),
    };

    assert!(
        store
            .complete_preference(request_id, "Espresso, no milk")
            .await
            .unwrap()
    );

    // Nobody is waiting any more; the record stays until something removes it.
    let record = store.get_preference(request_id).await.unwrap().unwrap();
    assert!(record.is_completed);
    assert_eq!(record.result_text.as_deref(), Some("Espresso, no milk"));
}

#[tokio::test]
async fn test_record_deleted_by_third_party_is_reported() {
    let (store, _pool) = sqlite_store().await;
    let submitter = RecommendationSubmitter::new(
        store.clone(),
        RetryPolicy::new(50, Duration::from_millis(20)),
    );

    let waiter = {
        let submitter = submitter.clone();
        tokio::spawn(async move {
            submitter
                .submit(&RecommendationRequest::new(1, "sweet", "mild", "oat"))
                .await
        })
    };

    // Wait until the record exists, then remove it out from under the submitter.
    let id = loop {
        if let Some(record) = store.list_pending(1).await.unwrap().into_iter().next() {
            break record.id;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert!(store.delete_preference(id).await.unwrap());

    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::RecordVanished { request_id } if request_id == id));
}

#[tokio::test]
async fn test_notify_wakes_submitter_before_poll_interval() {
    let (store, _pool) = sqlite_store().await;
    let notify = Arc::new(Notify::new());
    let worker = spawn_fake_worker(store.clone(), Some(notify.clone()));
    let submitter = RecommendationSubmitter::new(
        store.clone(),
        RetryPolicy::new(3, Duration::from_secs(30)),
    )
    .with_completion_notify(notify);

    let text = tokio::time::timeout(
        Duration::from_secs(10),
        submitter.submit(&RecommendationRequest::new(2, "bold", "strong", "none")),
    )
    .await
    .expect("notification should end the wait early")
    .unwrap();

    assert!(text.starts_with("Recommended for"));

    worker.abort();
}

#[tokio::test]
async fn test_postgres_submit_round_trip() {
    let Some(store) = common::postgres_store().await else {
        return;
    };

    sqlx::query("INSERT INTO users (id, name) VALUES (4242, 'Pg User') ON CONFLICT (id) DO NOTHING")
        .execute(store.pool())
        .await
        .unwrap();

    let worker = spawn_fake_worker(store.clone(), None);
    let submitter = RecommendationSubmitter::new(store.clone(), fast_policy(100));

    let text = submitter
        .submit(&RecommendationRequest::new(4242, "bold", "strong", "none"))
        .await
        .unwrap();

    assert_eq!(
        text,
        canned_answer("Taste: bold, Intensity: strong, Milk Preference: none")
    );

    worker.abort();
}
