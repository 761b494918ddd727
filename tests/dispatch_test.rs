mod common;

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use release_watch::calendar::CalendarObject;
use release_watch::dispatch::{Dispatcher, Outcome, Reminder};
use release_watch::error::TrackerError;
use release_watch::ics::ReminderEvent;

use common::{calendar, RecordingCalendar};

fn reminder(title: &str, date: &str) -> Reminder {
    Reminder {
        title: title.into(),
        description: "desc".into(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
    }
}

fn existing_event(title: &str, start: &str, end: &str) -> CalendarObject {
    let day = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
    let event = ReminderEvent {
        uid: "existing".into(),
        summary: title.into(),
        description: String::new(),
        start: day(start),
        end: day(end),
        stamp: chrono::Utc::now(),
    };
    CalendarObject {
        url: "https://dav.example.com/cal/releases/existing.ics".into(),
        etag: Some("\"1\"".into()),
        data: event.to_ics(),
    }
}

fn ready(cal: &RecordingCalendar, objects: Vec<CalendarObject>) -> Dispatcher {
    let dispatcher = Dispatcher::new(Arc::new(cal.clone()), Duration::ZERO);
    let mut handle = calendar("Releases");
    handle.objects = objects;
    dispatcher.attach(handle);
    dispatcher
}

#[tokio::test]
async fn existing_matching_event_suppresses_creation() {
    let existing = existing_event("Andor S02E01", "2025-04-22", "2025-04-23");
    let cal = RecordingCalendar::with_objects(vec![existing.clone()]);
    let dispatcher = ready(&cal, vec![existing]);

    dispatcher.notify(reminder("Andor S02E01", "2025-04-22"), false);
    dispatcher.notify(reminder("Andor S02E01", "2025-04-22"), true);
    dispatcher.wait_idle().await;

    assert!(cal.created().await.is_empty());
}

#[tokio::test]
async fn repeated_notify_creates_one_event() {
    let cal = RecordingCalendar::default();
    let dispatcher = ready(&cal, vec![]);

    let first = dispatcher
        .dispatch(reminder("Andor S02E01", "2025-04-22"), false)
        .await
        .unwrap();
    assert!(matches!(first, Outcome::Created { .. }));
    let second = dispatcher
        .dispatch(reminder("Andor S02E01", "2025-04-22"), false)
        .await
        .unwrap();
    assert_eq!(second, Outcome::AlreadyScheduled);

    let created = cal.created().await;
    assert_eq!(created.len(), 1);
    assert!(created[0].filename.ends_with(".ics"));
    assert!(created[0].data.contains("SUMMARY:Andor S02E01"));
    assert!(created[0].data.contains("DTSTART;VALUE=DATE:20250422"));
    assert!(created[0].data.contains("DTEND;VALUE=DATE:20250423"));
    assert!(created[0].data.contains("TRIGGER:-PT1H"));
}

#[tokio::test]
async fn concurrent_fire_and_forget_notifies_create_once() {
    let cal = RecordingCalendar {
        lagging: true,
        ..Default::default()
    };
    let dispatcher = ready(&cal, vec![]);

    for _ in 0..3 {
        dispatcher.notify(reminder("Dune: Part Two (Theatrical)", "2024-03-01"), true);
    }
    dispatcher.wait_idle().await;

    assert_eq!(cal.created().await.len(), 1);
    // resyncs ran but the lagging server view did not drop the local event
    assert!(*cal.syncs.lock().await >= 1);
    assert_eq!(dispatcher.current().unwrap().objects.len(), 1);
}

#[tokio::test]
async fn different_dates_are_distinct_events() {
    let existing = existing_event("Andor S02E01", "2025-04-22", "2025-04-23");
    let cal = RecordingCalendar::with_objects(vec![existing.clone()]);
    let dispatcher = ready(&cal, vec![existing]);

    let outcome = dispatcher
        .dispatch(reminder("Andor S02E01", "2025-04-29"), false)
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Created { .. }));
    assert_eq!(cal.created().await.len(), 1);
}

#[tokio::test]
async fn rejected_creation_is_an_error() {
    let cal = RecordingCalendar {
        reject_with: Some(412),
        ..Default::default()
    };
    let dispatcher = ready(&cal, vec![]);

    let err = dispatcher
        .dispatch(reminder("Shogun S02E01", "2026-01-10"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::NotificationCreateFailed { status: 412 }));
    assert!(dispatcher.current().unwrap().objects.is_empty());
}

#[tokio::test]
async fn waits_for_calendar_to_become_ready() {
    let cal = RecordingCalendar::default();
    let dispatcher = Dispatcher::new(Arc::new(cal.clone()), Duration::ZERO);

    let pending = {
        let d = dispatcher.clone();
        tokio::spawn(async move {
            d.dispatch(reminder("Fallout S02E01", "2025-12-17"), false).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cal.created().await.is_empty());

    dispatcher.attach(calendar("Releases"));
    let outcome = pending.await.unwrap().unwrap();
    assert!(matches!(outcome, Outcome::Created { .. }));
}

#[tokio::test]
async fn connect_discovers_named_calendar() {
    let existing = existing_event("Fallout S02E01", "2025-12-17", "2025-12-18");
    let mut cal = RecordingCalendar::with_objects(vec![existing]);
    cal.calendars = vec![calendar("Personal"), calendar("Releases")];

    let dispatcher = Dispatcher::connect(
        Arc::new(cal.clone()),
        Some("Releases".into()),
        Duration::ZERO,
    );
    dispatcher.notify(reminder("Fallout S02E01", "2025-12-17"), false);
    dispatcher.wait_idle().await;

    let handle = dispatcher.current().unwrap();
    assert_eq!(handle.display_name.as_deref(), Some("Releases"));
    assert!(cal.created().await.is_empty());
}

#[tokio::test]
async fn failed_discovery_rejects_dispatch() {
    let mut cal = RecordingCalendar::default();
    cal.calendars = vec![calendar("Personal")];

    let dispatcher = Dispatcher::connect(
        Arc::new(cal.clone()),
        Some("Releases".into()),
        Duration::ZERO,
    );
    let err = dispatcher
        .dispatch(reminder("Fallout S02E01", "2025-12-17"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::CalendarNotReady));
    assert!(cal.created().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn expedited_dispatch_waits_for_grace_period() {
    let cal = RecordingCalendar::default();
    let dispatcher = Dispatcher::new(Arc::new(cal.clone()), Duration::from_secs(3));
    dispatcher.attach(calendar("Releases"));

    let started = tokio::time::Instant::now();
    dispatcher
        .dispatch(reminder("Severance S02E01", "2025-01-17"), true)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(3));

    let started = tokio::time::Instant::now();
    dispatcher
        .dispatch(reminder("Severance S02E02", "2025-01-24"), false)
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));
}
