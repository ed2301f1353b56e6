mod common;

use celestia_bookings::domain::booking::{BookingStatus, StatusChange};
use celestia_bookings::domain::checkout::RedirectTargets;
use celestia_bookings::domain::notification::{
    booking_ref, DeliveryStatus, Notification, TemplateKind,
};
use celestia_bookings::repo::booking_store::BookingStore;
use celestia_bookings::repo::memory_store::MemoryBookingStore;
use celestia_bookings::service::notification_dispatcher::{
    DispatchCounts, NotificationQueue, NotificationWorker, MAX_DELIVERY_ATTEMPTS,
};
use common::{harness, relay, RecordingNotifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn note(to: &str) -> Notification {
    Notification {
        to: to.to_string(),
        kind: TemplateKind::BookingConfirmation,
        data: serde_json::json!({"booking_ref": "CS_TEST1"}),
    }
}

#[tokio::test]
async fn worker_counts_sent_and_failed_deliveries() {
    let (queue, receiver) = NotificationQueue::channel(8);
    let stats = queue.stats.clone();
    let notifier = Arc::new(RecordingNotifier::default());

    queue.enqueue(note("alice@example.com"));
    queue.enqueue(note("ghost@bounce.test"));
    queue.enqueue(note("operator@example.com"));
    drop(queue);

    NotificationWorker {
        receiver,
        notifier: notifier.clone(),
        stats: stats.clone(),
    }
    .run()
    .await;

    assert_eq!(
        stats.snapshot(),
        DispatchCounts {
            sent: 2,
            failed: 1,
            dropped: 0
        }
    );
    assert_eq!(
        *notifier.delivered.lock().unwrap(),
        vec!["alice@example.com".to_string(), "operator@example.com".to_string()]
    );
}

#[tokio::test]
async fn full_queue_drops_without_blocking_caller() {
    let (queue, mut receiver) = NotificationQueue::channel(2);

    for _ in 0..5 {
        queue.enqueue(note("alice@example.com"));
    }

    assert_eq!(queue.stats.snapshot().dropped, 3);
    let mut queued = 0;
    while receiver.try_recv().is_ok() {
        queued += 1;
    }
    assert_eq!(queued, 2);
}

#[test]
fn subjects_carry_reference_and_service() {
    let data = serde_json::json!({
        "service_name": "Birth Chart Reading",
        "booking_ref": booking_ref("cs_test_a1b2c3d4"),
    });
    assert_eq!(
        TemplateKind::BookingConfirmation.subject(&data),
        "Session Confirmed - A1B2C3D4"
    );
    assert_eq!(
        TemplateKind::OperatorPaymentAlert.subject(&data),
        "Payment Received - Birth Chart Reading"
    );
}

/// Checks out one booking and pays it with the given recipients queued
/// in the same write.
async fn paid_with(recipients: &[&str]) -> MemoryBookingStore {
    let h = harness();
    let id = h
        .coordinator
        .initiate_checkout("personal-tarot", "alice@example.com", RedirectTargets::default())
        .await
        .unwrap()
        .checkout_session_id;
    let change = StatusChange::paid(Some("pi_1".to_string()), chrono::Utc::now())
        .with_notifications(recipients.iter().map(|to| note(to)).collect());
    assert!(h
        .store
        .conditional_update_status(&id, BookingStatus::Pending, change)
        .await
        .unwrap());
    h.store
}

#[tokio::test]
async fn relay_sends_queued_rows_and_marks_them_sent() {
    let store = paid_with(&["alice@example.com", "operator@example.com"]).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let relay = relay(Arc::new(store.clone()), notifier.clone());

    assert_eq!(relay.tick().await.unwrap(), 2);
    assert_eq!(relay.tick().await.unwrap(), 0);

    assert_eq!(notifier.delivered.lock().unwrap().len(), 2);
    assert!(store
        .outbox()
        .await
        .iter()
        .all(|q| q.status == DeliveryStatus::Sent));
    assert_eq!(relay.stats.snapshot().sent, 2);
}

#[tokio::test]
async fn failed_delivery_is_retried_later_then_abandoned() {
    let store = paid_with(&["ghost@bounce.test"]).await;
    let relay = relay(Arc::new(store.clone()), Arc::new(RecordingNotifier::default()));

    assert_eq!(relay.tick().await.unwrap(), 1);
    let row = store.outbox().await.remove(0);
    assert_eq!(row.status, DeliveryStatus::Pending);
    assert_eq!(row.attempts, 1);
    // backed off, so not due yet
    assert_eq!(relay.tick().await.unwrap(), 0);

    store
        .mark_notification_retry(row.id, MAX_DELIVERY_ATTEMPTS - 1, Some(chrono::Utc::now()))
        .await
        .unwrap();
    assert_eq!(relay.tick().await.unwrap(), 1);

    let row = store.outbox().await.remove(0);
    assert_eq!(row.status, DeliveryStatus::Failed);
    assert_eq!(row.attempts, MAX_DELIVERY_ATTEMPTS);
    assert_eq!(relay.tick().await.unwrap(), 0);
    assert_eq!(relay.stats.snapshot().failed, 2);
}

#[tokio::test]
async fn relay_drains_due_rows_before_stopping() {
    let store = paid_with(&["alice@example.com"]).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let relay = relay(Arc::new(store.clone()), notifier.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    let handle = tokio::spawn(relay.run(shutdown_rx));

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("relay did not stop")
        .unwrap();
    assert_eq!(*notifier.delivered.lock().unwrap(), vec!["alice@example.com".to_string()]);
}
