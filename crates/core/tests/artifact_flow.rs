//! Polls, message counter and whiteboard against a real database.

#![allow(clippy::unwrap_used)]

mod common;

use common::{Harness, ORGANIZER};
use futures::future::join_all;
use liveclass_common::AppError;
use liveclass_core::CreatePollInput;
use serde_json::json;

fn poll(options: &[&str]) -> CreatePollInput {
    CreatePollInput {
        question: "Which topic next?".to_string(),
        options: options.iter().map(ToString::to_string).collect(),
    }
}

#[tokio::test]
async fn test_single_option_poll_is_rejected() {
    let h = Harness::new().await;
    let session = h.live(5).await;

    let result = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["only"]))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(h.sessions.get(&session.id).await.unwrap().polls_created, 0);
}

#[tokio::test]
async fn test_closed_poll_reports_zero_counts() {
    let h = Harness::new().await;
    let session = h.live(5).await;

    let created = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["yes", "no"]))
        .await
        .unwrap();
    assert!(created.is_active);
    let closed = h
        .artifacts
        .close_poll(ORGANIZER, &session.id, &created.id)
        .await
        .unwrap();
    assert!(!closed.is_active);

    let results = h.artifacts.results(&created.id).await.unwrap();
    assert_eq!(results.counts, vec![0, 0]);
    assert_eq!(results.total_responses, 0);
    assert_eq!(results.options, ["yes", "no"]);
    assert!(!results.is_active);
}

#[tokio::test]
async fn test_poll_requires_live_session_and_organizer() {
    let h = Harness::new().await;
    let session = h.scheduled(5).await;

    let result = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["yes", "no"]))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    h.sessions.start(ORGANIZER, &session.id).await.unwrap();
    let result = h
        .artifacts
        .create_poll("student1", &session.id, poll(&["yes", "no"]))
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_last_response_wins() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    let p = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["red", "green", "blue"]))
        .await
        .unwrap();

    h.artifacts.respond(&session.id, &p.id, "a", 0).await.unwrap();
    h.artifacts.respond(&session.id, &p.id, "b", 2).await.unwrap();
    h.advance_minutes(1);
    h.artifacts.respond(&session.id, &p.id, "a", 1).await.unwrap();

    let results = h.artifacts.results(&p.id).await.unwrap();
    assert_eq!(results.counts, vec![0, 1, 1]);
    assert_eq!(results.total_responses, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_submit_counts_once() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    let p = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["yes", "no"]))
        .await
        .unwrap();

    let submissions = (0..6).map(|i| {
        let artifacts = h.artifacts.clone();
        let session_id = session.id.clone();
        let poll_id = p.id.clone();
        tokio::spawn(async move { artifacts.respond(&session_id, &poll_id, "a", i % 2).await })
    });
    for result in join_all(submissions).await {
        assert!(result.unwrap().is_ok());
    }

    let results = h.artifacts.results(&p.id).await.unwrap();
    assert_eq!(results.total_responses, 1);
}

#[tokio::test]
async fn test_respond_validation() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    let other = h.live(5).await;
    let p = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["yes", "no"]))
        .await
        .unwrap();

    for index in [-1, 2] {
        assert!(matches!(
            h.artifacts.respond(&session.id, &p.id, "a", index).await,
            Err(AppError::InvalidOption(_))
        ));
    }

    // Poll from another session
    assert!(matches!(
        h.artifacts.respond(&other.id, &p.id, "a", 0).await,
        Err(AppError::NotFound(_))
    ));

    h.artifacts.close_poll(ORGANIZER, &session.id, &p.id).await.unwrap();
    assert!(matches!(
        h.artifacts.respond(&session.id, &p.id, "a", 0).await,
        Err(AppError::PollNotActive(_))
    ));
}

#[tokio::test]
async fn test_close_poll_is_idempotent() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    let p = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["yes", "no"]))
        .await
        .unwrap();

    let first = h.artifacts.close_poll(ORGANIZER, &session.id, &p.id).await.unwrap();
    h.advance_minutes(2);
    let second = h.artifacts.close_poll(ORGANIZER, &session.id, &p.id).await.unwrap();
    assert!(!second.is_active);
    assert_eq!(first.closed_at, second.closed_at);
}

#[tokio::test]
async fn test_new_poll_supersedes_active_one() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    let first = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["yes", "no"]))
        .await
        .unwrap();
    h.artifacts.respond(&session.id, &first.id, "a", 0).await.unwrap();
    let second = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["up", "down"]))
        .await
        .unwrap();

    assert!(matches!(
        h.artifacts.respond(&session.id, &first.id, "a", 1).await,
        Err(AppError::PollNotActive(_))
    ));
    assert_eq!(h.artifacts.results(&first.id).await.unwrap().counts, vec![1, 0]);

    let polls = h.artifacts.list_polls(&session.id).await.unwrap();
    assert_eq!(polls.len(), 2);
    assert_eq!((polls[0].position, polls[1].position), (0, 1));
    assert_eq!(polls[1].id, second.id);
    assert_eq!(polls.iter().filter(|p| p.is_active).count(), 1);
    assert_eq!(h.sessions.get(&session.id).await.unwrap().polls_created, 2);
}

#[tokio::test]
async fn test_end_seals_polls() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    let p = h
        .artifacts
        .create_poll(ORGANIZER, &session.id, poll(&["yes", "no"]))
        .await
        .unwrap();
    h.advance_minutes(5);
    h.sessions.end(ORGANIZER, &session.id).await.unwrap();

    assert!(!h.artifacts.results(&p.id).await.unwrap().is_active);
    assert!(matches!(
        h.artifacts.respond(&session.id, &p.id, "a", 0).await,
        Err(AppError::PollNotActive(_))
    ));
}

#[tokio::test]
async fn test_record_message() {
    let h = Harness::new().await;
    let session = h.scheduled(5).await;

    assert!(matches!(
        h.artifacts.record_message(&session.id).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        h.artifacts.record_message("missing").await,
        Err(AppError::NotFound(_))
    ));

    h.sessions.start(ORGANIZER, &session.id).await.unwrap();
    let sends = (0..5).map(|_| h.artifacts.record_message(&session.id));
    for result in join_all(sends).await {
        result.unwrap();
    }
    assert_eq!(h.sessions.get(&session.id).await.unwrap().total_messages, 5);
}

#[tokio::test]
async fn test_whiteboard_snapshot() {
    let h = Harness::new().await;
    let session = h.live(5).await;

    let empty = h.artifacts.get_whiteboard(&session.id).await.unwrap();
    assert!(empty.snapshot.is_none());

    h.artifacts
        .save_whiteboard(&session.id, json!({"strokes": [1]}))
        .await
        .unwrap();
    h.advance_minutes(1);
    let saved = h
        .artifacts
        .save_whiteboard(&session.id, json!({"strokes": [1, 2]}))
        .await
        .unwrap();
    assert_eq!(saved.snapshot, Some(json!({"strokes": [1, 2]})));

    let fetched = h.artifacts.get_whiteboard(&session.id).await.unwrap();
    assert_eq!(fetched.snapshot, saved.snapshot);
    assert_eq!(fetched.updated_at, saved.updated_at);

    h.sessions.end(ORGANIZER, &session.id).await.unwrap();
    assert!(matches!(
        h.artifacts.save_whiteboard(&session.id, json!({})).await,
        Err(AppError::Conflict(_))
    ));
}
