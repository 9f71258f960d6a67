mod common;

use std::time::{Duration as StdDuration, Instant};

use chrono::Duration;
use common::{harness, harness_custom, harness_with, noon, FakeRooms};
use vow_core::config::SchedulerConfig;
use vow_core::{CheckInCadence, NotificationCategory, SessionStatus, WillStatus};
use vow_store::NewWill;

#[tokio::test]
async fn short_cycle_goes_straight_to_review() {
    let h = harness();
    let now = noon();
    let will = h
        .store
        .insert_will(NewWill::solo("u1", now - Duration::hours(1), Some(now - Duration::minutes(1))))
        .unwrap();
    h.store
        .insert_commitment(&will.id, "u1", "no sugar", CheckInCadence::Daily, None)
        .unwrap();

    let report = h.engine.heavy_tick(now).await;
    assert_eq!(report.transitions.to_review, 1);
    assert_eq!(h.store.get_will(&will.id).unwrap().unwrap().status, WillStatus::WillReview);

    // Review-required goes out in the same tick; started never does.
    assert_eq!(h.transport.recipients(NotificationCategory::ReviewRequired), vec!["u1"]);
    assert_eq!(h.transport.count(NotificationCategory::WillStarted), 0);
}

#[tokio::test]
async fn session_closing_last_completes_the_will() {
    let h = harness();
    let now = noon();
    let will = h
        .store
        .insert_will(
            NewWill::circle("u1", "c1", now - Duration::days(7), Some(now - Duration::hours(2)))
                .with_status(WillStatus::WillReview)
                .with_session_at(now - Duration::minutes(35)),
        )
        .unwrap();
    for user in ["u1", "u2"] {
        h.store
            .insert_commitment(&will.id, user, "read", CheckInCadence::Daily, None)
            .unwrap();
        h.store.insert_review(&will.id, user, "done").unwrap();
    }
    assert!(h.store.open_session(&will.id, now - Duration::minutes(31)).unwrap());
    assert!(h.store.set_session_url(&will.id, "https://rooms.test/abc").unwrap());

    let report = h.engine.heavy_tick(now).await;
    assert_eq!(report.sessions_closed, 1);

    let after = h.store.get_will(&will.id).unwrap().unwrap();
    assert_eq!(after.session_status, Some(SessionStatus::Completed));
    assert_eq!(after.status, WillStatus::Completed);
    assert_eq!(*h.rooms.deleted.lock().unwrap(), vec!["https://rooms.test/abc"]);
}

#[tokio::test]
async fn completion_waits_for_every_review() {
    let h = harness();
    let now = noon();
    let will = h
        .store
        .insert_will(NewWill::solo("u1", now - Duration::days(3), Some(now - Duration::days(1))))
        .unwrap();
    for user in ["u1", "u2"] {
        h.store
            .insert_commitment(&will.id, user, "walk", CheckInCadence::Daily, None)
            .unwrap();
    }
    h.store.insert_review(&will.id, "u1", "done").unwrap();

    for minute in 0..3 {
        h.engine.heavy_tick(now + Duration::minutes(minute)).await;
        assert_eq!(h.store.get_will(&will.id).unwrap().unwrap().status, WillStatus::WillReview);
    }

    h.store.insert_review(&will.id, "u2", "done too").unwrap();
    h.engine.heavy_tick(now + Duration::minutes(3)).await;
    assert_eq!(h.store.get_will(&will.id).unwrap().unwrap().status, WillStatus::Completed);
}

#[tokio::test]
async fn completion_waits_for_unfinished_session() {
    let h = harness();
    let now = noon();
    let will = h
        .store
        .insert_will(
            NewWill::circle("u1", "c1", now - Duration::days(3), Some(now - Duration::days(1)))
                .with_status(WillStatus::WillReview)
                .with_session_at(now + Duration::days(1)),
        )
        .unwrap();
    h.store
        .insert_commitment(&will.id, "u1", "walk", CheckInCadence::Daily, None)
        .unwrap();
    h.store.insert_review(&will.id, "u1", "done").unwrap();

    for minute in 0..3 {
        h.engine.heavy_tick(now + Duration::minutes(minute)).await;
    }
    let after = h.store.get_will(&will.id).unwrap().unwrap();
    assert_eq!(after.session_status, Some(SessionStatus::Pending));
    assert_eq!(after.status, WillStatus::WillReview);
}

#[tokio::test]
async fn no_session_and_full_reviews_complete_on_next_tick() {
    let h = harness();
    let now = noon();
    let will = h
        .store
        .insert_will(
            NewWill::solo("u1", now - Duration::days(2), Some(now - Duration::minutes(1)))
                .with_status(WillStatus::Active),
        )
        .unwrap();
    h.store
        .insert_commitment(&will.id, "u1", "walk", CheckInCadence::Daily, None)
        .unwrap();
    h.store.insert_review(&will.id, "u1", "early").unwrap();

    h.engine.heavy_tick(now).await;
    assert_eq!(h.store.get_will(&will.id).unwrap().unwrap().status, WillStatus::WillReview);
    h.engine.heavy_tick(now + Duration::minutes(1)).await;
    assert_eq!(h.store.get_will(&will.id).unwrap().unwrap().status, WillStatus::Completed);
}

#[tokio::test]
async fn repeated_tick_changes_nothing() {
    let h = harness();
    let now = noon();
    let will = h
        .store
        .insert_will(NewWill::solo("u1", now - Duration::days(1), Some(now + Duration::days(1))))
        .unwrap();
    h.store
        .insert_commitment(&will.id, "u1", "walk", CheckInCadence::Daily, None)
        .unwrap();

    let first = h.engine.heavy_tick(now).await;
    assert_eq!(first.transitions.activated, 1);
    let sent_after_first = h.transport.sent().len();
    let state_after_first = h.store.get_will(&will.id).unwrap().unwrap();

    let second = h.engine.heavy_tick(now).await;
    assert_eq!(second.transitions, Default::default());
    assert_eq!(second.notifications.sent, 0);
    assert_eq!(h.transport.sent().len(), sent_after_first);

    let state_after_second = h.store.get_will(&will.id).unwrap().unwrap();
    assert_eq!(state_after_first.status, state_after_second.status);
    assert_eq!(
        state_after_first.midpoint_notification_sent_at,
        state_after_second.midpoint_notification_sent_at
    );
}

#[tokio::test]
async fn status_never_regresses_over_a_timeline() {
    let h = harness();
    let start = noon();
    let end = start + Duration::hours(6);
    let will = h
        .store
        .insert_will(
            NewWill::circle("u1", "c1", start, Some(end))
                .with_status(WillStatus::Scheduled)
                .with_session_at(end + Duration::minutes(10)),
        )
        .unwrap();
    h.store
        .insert_commitment(&will.id, "u1", "write", CheckInCadence::Daily, None)
        .unwrap();

    let mut observed = vec![WillStatus::Scheduled];
    let mut at = start - Duration::hours(1);
    while at < end + Duration::hours(2) {
        if at > end + Duration::minutes(45) && h.store.count_reviews(&will.id).unwrap() == 0 {
            h.store.insert_review(&will.id, "u1", "done").unwrap();
        }
        h.engine.heavy_tick(at).await;
        observed.push(h.store.get_will(&will.id).unwrap().unwrap().status);
        at += Duration::minutes(5);
    }

    assert!(observed.windows(2).all(|w| w[0].rank() <= w[1].rank()), "{observed:?}");
    assert_eq!(observed.last(), Some(&WillStatus::Completed));
    assert!(observed.contains(&WillStatus::Active));
}

#[tokio::test]
async fn session_opens_with_room_and_notifies() {
    let h = harness();
    let now = noon();
    let will = h
        .store
        .insert_will(
            NewWill::circle("u1", "c1", now - Duration::days(1), Some(now + Duration::days(1)))
                .with_status(WillStatus::Active)
                .with_session_at(now - Duration::minutes(1)),
        )
        .unwrap();
    h.store
        .insert_commitment(&will.id, "u1", "walk", CheckInCadence::Daily, None)
        .unwrap();

    let report = h.engine.heavy_tick(now).await;
    assert_eq!(report.sessions_opened, 1);

    let after = h.store.get_will(&will.id).unwrap().unwrap();
    assert_eq!(after.session_status, Some(SessionStatus::Open));
    assert_eq!(after.session_opened_at, Some(now));
    let url = format!("https://rooms.test/room-{}", will.id);
    assert_eq!(after.session_url.as_deref(), Some(url.as_str()));

    let live: Vec<_> = h
        .transport
        .sent()
        .into_iter()
        .filter(|(_, n)| n.category == NotificationCategory::SessionLive)
        .collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].0, vec!["u1"]);
    assert_eq!(live[0].1.data["url"], url.as_str());

    // Next tick does not open it again or create a second room.
    h.engine.heavy_tick(now + Duration::minutes(1)).await;
    assert_eq!(h.rooms.created.lock().unwrap().len(), 1);
    assert_eq!(h.transport.count(NotificationCategory::SessionLive), 1);
}

#[tokio::test]
async fn provider_outage_still_opens_session_without_url() {
    let h = harness_with(FakeRooms::failing());
    let now = noon();
    let will = h
        .store
        .insert_will(
            NewWill::circle("u1", "c1", now - Duration::days(1), None)
                .with_status(WillStatus::Active)
                .with_session_at(now - Duration::minutes(1)),
        )
        .unwrap();
    h.store
        .insert_commitment(&will.id, "u1", "walk", CheckInCadence::Daily, None)
        .unwrap();

    assert_eq!(h.engine.heavy_tick(now).await.sessions_opened, 1);
    let after = h.store.get_will(&will.id).unwrap().unwrap();
    assert_eq!(after.session_status, Some(SessionStatus::Open));
    assert!(after.session_url.is_none());

    let live = h.transport.sent();
    let (_, n) = live
        .iter()
        .find(|(_, n)| n.category == NotificationCategory::SessionLive)
        .unwrap();
    assert!(n.data["url"].is_null());
}

#[tokio::test]
async fn slow_provider_is_cut_off_at_the_provider_timeout() {
    let h = harness_custom(
        FakeRooms::slow(StdDuration::from_secs(30)),
        SchedulerConfig::default(),
        StdDuration::from_millis(50),
    );
    let now = noon();
    let will = h
        .store
        .insert_will(
            NewWill::circle("u1", "c1", now - Duration::days(1), None)
                .with_status(WillStatus::Active)
                .with_session_at(now - Duration::minutes(1)),
        )
        .unwrap();
    h.store
        .insert_commitment(&will.id, "u1", "walk", CheckInCadence::Daily, None)
        .unwrap();

    let started = Instant::now();
    assert_eq!(h.engine.heavy_tick(now).await.sessions_opened, 1);
    assert!(started.elapsed() < StdDuration::from_secs(5));

    let after = h.store.get_will(&will.id).unwrap().unwrap();
    assert_eq!(after.session_status, Some(SessionStatus::Open));
    assert!(after.session_url.is_none());
    assert_eq!(h.transport.count(NotificationCategory::SessionLive), 1);
}

#[tokio::test]
async fn solo_wills_never_get_a_session() {
    let h = harness();
    let now = noon();
    let will = h
        .store
        .insert_will(
            NewWill::solo("u1", now - Duration::days(1), None)
                .with_status(WillStatus::Active)
                .with_session_at(now - Duration::minutes(1)),
        )
        .unwrap();
    assert!(will.session_status.is_none());

    assert_eq!(h.engine.heavy_tick(now).await.sessions_opened, 0);
    assert!(h.rooms.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn legacy_status_is_not_lost() {
    let h = harness();
    let now = noon();
    let will = h
        .store
        .insert_will(
            NewWill::solo("u1", now - Duration::days(2), Some(now - Duration::days(1)))
                .with_status(WillStatus::WaitingForEndRoom),
        )
        .unwrap();

    h.engine.heavy_tick(now).await;
    assert_eq!(h.store.get_will(&will.id).unwrap().unwrap().status, WillStatus::WillReview);
}
