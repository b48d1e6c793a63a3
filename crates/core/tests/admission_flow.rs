//! Room admission against a real database, including racing joins.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::Utc;
use common::{Harness, ORGANIZER, all_devices, input};
use futures::future::join_all;
use liveclass_common::AppError;
use liveclass_core::DeviceCapabilities;

#[tokio::test]
async fn test_join_requires_live_session() {
    let h = Harness::new().await;
    let session = h.scheduled(5).await;

    let result = h.admission.join(&session.id, "a", all_devices()).await;
    assert!(matches!(result, Err(AppError::SessionNotJoinable(_))));

    h.sessions.start(ORGANIZER, &session.id).await.unwrap();
    h.join(&session.id, "a").await;
    h.advance_minutes(5);
    h.sessions.end(ORGANIZER, &session.id).await.unwrap();

    let result = h.admission.join(&session.id, "b", all_devices()).await;
    assert!(matches!(result, Err(AppError::SessionNotJoinable(_))));
}

#[tokio::test]
async fn test_join_unknown_session() {
    let h = Harness::new().await;
    let result = h.admission.join("missing", "a", all_devices()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_capacity_is_enforced() {
    let h = Harness::new().await;
    let session = h.live(2).await;
    h.join(&session.id, "a").await;
    h.join(&session.id, "b").await;

    let result = h.admission.join(&session.id, "c", all_devices()).await;
    assert!(matches!(result, Err(AppError::CapacityExceeded(_))));

    // A slot frees up once someone leaves
    h.admission.leave(&session.id, "a").await.unwrap();
    h.join(&session.id, "c").await;
}

#[tokio::test]
async fn test_device_requirements() {
    let h = Harness::new().await;
    let mut new_session = input(1);
    new_session.camera_required = true;
    new_session.microphone_required = true;
    let session = h.sessions.create(ORGANIZER, new_session).await.unwrap();
    h.sessions.start(ORGANIZER, &session.id).await.unwrap();

    let camera_only = DeviceCapabilities {
        camera: true,
        microphone: false,
    };
    let result = h.admission.join(&session.id, "a", camera_only).await;
    assert!(matches!(result, Err(AppError::DeviceRequirement(_))));
    assert_eq!(h.admission.get_occupancy(&session.id).await.unwrap().count, 0);

    h.join(&session.id, "a").await;

    // Capacity is checked before devices
    let result = h
        .admission
        .join(&session.id, "b", DeviceCapabilities::default())
        .await;
    assert!(matches!(result, Err(AppError::CapacityExceeded(_))));
}

#[tokio::test]
async fn test_duplicate_join_replaces_open_interval() {
    let h = Harness::new().await;
    let session = h.live(1).await;

    let first = h.admission.join(&session.id, "a", all_devices()).await.unwrap();
    assert!(first.first_join);
    assert!(!first.reconnected);

    h.advance_minutes(3);
    // Reconnect without a clean leave, even though the room is full
    let second = h.admission.join(&session.id, "a", all_devices()).await.unwrap();
    assert!(!second.first_join);
    assert!(second.reconnected);
    assert_eq!(second.occupancy, 1);

    let log = h.intervals.find_by_session(&session.id).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log.iter().filter(|i| i.is_open()).count(), 1);

    let current = h.sessions.get(&session.id).await.unwrap();
    assert_eq!(current.total_participants, 1);
    assert_eq!(current.peak_concurrent_users, 1);
}

#[tokio::test]
async fn test_leave_is_idempotent() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    h.join(&session.id, "a").await;
    h.advance_minutes(1);

    assert!(h.admission.leave(&session.id, "a").await.unwrap());
    assert!(!h.admission.leave(&session.id, "a").await.unwrap());
    assert!(!h.admission.leave(&session.id, "never_joined").await.unwrap());

    let log = h.intervals.find_by_session(&session.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert!(!log[0].is_open());
}

#[tokio::test]
async fn test_rejoin_after_leave_counts_once() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    h.join(&session.id, "a").await;
    h.advance_minutes(10);
    h.admission.leave(&session.id, "a").await.unwrap();
    h.advance_minutes(5);
    h.join(&session.id, "a").await;

    let current = h.sessions.get(&session.id).await.unwrap();
    assert_eq!(current.total_participants, 1);
    assert_eq!(h.intervals.find_by_session(&session.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_occupancy_query() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    h.join(&session.id, "b").await;
    h.join(&session.id, "a").await;
    h.join(&session.id, "c").await;
    h.admission.leave(&session.id, "c").await.unwrap();

    let occupancy = h.admission.get_occupancy(&session.id).await.unwrap();
    assert_eq!(occupancy.count, 2);
    assert_eq!(occupancy.participant_ids, ["a", "b"]);
    assert_eq!(occupancy.max_participants, 5);
    assert_eq!(occupancy.room_id, session.room_id);
}

#[tokio::test]
async fn test_peak_tracks_historical_maximum() {
    let h = Harness::new().await;
    let session = h.live(10).await;

    // occupancy: 1, 2, 3, 2, 1, 2, 3, 4, 3
    let steps: [(&str, bool); 9] = [
        ("a", true),
        ("b", true),
        ("c", true),
        ("a", false),
        ("b", false),
        ("d", true),
        ("e", true),
        ("f", true),
        ("c", false),
    ];
    let mut occupancy = 0_i64;
    let mut expected_peak = 0_i64;
    for (participant, joining) in steps {
        h.advance_minutes(1);
        if joining {
            h.join(&session.id, participant).await;
            occupancy += 1;
        } else {
            h.admission.leave(&session.id, participant).await.unwrap();
            occupancy -= 1;
        }
        expected_peak = expected_peak.max(occupancy);

        let current = h.sessions.get(&session.id).await.unwrap();
        assert_eq!(current.peak_concurrent_users, expected_peak);
    }
    assert_eq!(expected_peak, 4);

    // The log-derived figures agree at completion
    h.advance_minutes(1);
    let completed = h.sessions.end(ORGANIZER, &session.id).await.unwrap();
    assert_eq!(completed.peak_concurrent_users, 4);
    assert_eq!(completed.total_participants, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_exceed_capacity() {
    const CAPACITY: i32 = 3;
    const ATTEMPTS: usize = 12;

    let h = Harness::new().await;
    let session = h.live(CAPACITY).await;

    let attempts = (0..ATTEMPTS).map(|i| {
        let admission = h.admission.clone();
        let session_id = session.id.clone();
        tokio::spawn(async move {
            admission
                .join(&session_id, &format!("student{i}"), all_devices())
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::CapacityExceeded(_))))
        .count();
    assert_eq!(admitted, CAPACITY as usize);
    assert_eq!(rejected, ATTEMPTS - CAPACITY as usize);

    let occupancy = h.admission.get_occupancy(&session.id).await.unwrap();
    assert_eq!(occupancy.count, CAPACITY as usize);
    let current = h.sessions.get(&session.id).await.unwrap();
    assert_eq!(current.peak_concurrent_users, i64::from(CAPACITY));
    assert_eq!(current.total_participants, i64::from(CAPACITY));
}

#[tokio::test]
async fn test_last_slot_race() {
    let h = Harness::new().await;
    let session = h.live(2).await;
    h.join(&session.id, "a").await;

    let (b, c) = tokio::join!(
        h.admission.join(&session.id, "b", all_devices()),
        h.admission.join(&session.id, "c", all_devices()),
    );
    assert_eq!(usize::from(b.is_ok()) + usize::from(c.is_ok()), 1);
    assert_eq!(h.admission.get_occupancy(&session.id).await.unwrap().count, 2);
}

#[tokio::test]
async fn test_join_admitted_before_end_is_counted() {
    let h = Harness::new().await;
    let session = h.live(5).await;
    h.advance_minutes(10);

    let (joined, ended) = tokio::join!(
        h.admission.join(&session.id, "a", all_devices()),
        h.sessions.end(ORGANIZER, &session.id),
    );
    let ended = ended.unwrap();

    // Either the join won the lock and is part of the rollup, or it saw the
    // session as no longer live.
    match joined {
        Ok(admission) => {
            assert_eq!(ended.total_participants, 1);
            let log = h.intervals.find_by_session(&session.id).await.unwrap();
            assert_eq!(log[0].id, admission.interval.id);
            assert!(log[0].left_at.is_some());
        }
        Err(e) => {
            assert!(matches!(e, AppError::SessionNotJoinable(_)));
            assert_eq!(ended.total_participants, 0);
        }
    }
    assert!(ended.actual_end.unwrap().with_timezone(&Utc) > ended.actual_start.unwrap().with_timezone(&Utc));
}

#[tokio::test]
async fn test_signals_after_end_leave_no_room_locks() {
    let h = Harness::new().await;

    for _ in 0..5 {
        let session = h.live(5).await;
        h.join(&session.id, "a").await;
        h.advance_minutes(10);
        h.sessions.end(ORGANIZER, &session.id).await.unwrap();

        // Disconnect and stray joins arriving after the class is over
        assert!(!h.admission.leave(&session.id, "a").await.unwrap());
        let late = h.admission.join(&session.id, "b", all_devices()).await;
        assert!(matches!(late, Err(AppError::SessionNotJoinable(_))));
    }

    let cancelled = h.live(5).await;
    h.sessions.cancel(ORGANIZER, &cancelled.id).await.unwrap();
    assert!(!h.admission.leave(&cancelled.id, "a").await.unwrap());

    assert!(h.locks.is_empty());
}
