use celestia_bookings::domain::booking::{
    Booking, BookingStatus, PaymentStatus, StatusChange,
};
use celestia_bookings::repo::booking_store::BookingStore;
use celestia_bookings::repo::memory_store::MemoryBookingStore;
use celestia_bookings::service::expiry_sweep::expire_pending;
use chrono::{Duration, Utc};
use uuid::Uuid;

fn pending(checkout_session_id: &str, age_hours: i64) -> Booking {
    let created_at = Utc::now() - Duration::hours(age_hours);
    Booking {
        booking_id: Uuid::new_v4(),
        checkout_session_id: checkout_session_id.to_string(),
        correlation_token: Uuid::new_v4(),
        service_key: "general-reading".to_string(),
        service_name: "General Reading".to_string(),
        duration_mins: 45,
        amount_minor: 6500,
        currency: "usd".to_string(),
        user_email: "dana@example.com".to_string(),
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Unpaid,
        payment_reference: None,
        flagged: false,
        created_at,
        updated_at: created_at,
        paid_at: None,
    }
}

#[tokio::test]
async fn expires_only_stale_pending_bookings() {
    let store = MemoryBookingStore::new();
    store.create(&pending("cs_old", 30)).await.unwrap();
    store.create(&pending("cs_fresh", 1)).await.unwrap();
    store.create(&pending("cs_paid", 30)).await.unwrap();
    store
        .conditional_update_status(
            "cs_paid",
            BookingStatus::Pending,
            StatusChange::paid(Some("pi_1".to_string()), Utc::now()),
        )
        .await
        .unwrap();

    let cutoff = Utc::now() - Duration::hours(24);
    assert_eq!(expire_pending(&store, cutoff, 100).await.unwrap(), 1);

    let status = |id: &'static str| {
        let store = store.clone();
        async move {
            store
                .find_by_checkout_session_id(id)
                .await
                .unwrap()
                .unwrap()
                .status
        }
    };
    assert_eq!(status("cs_old").await, BookingStatus::Expired);
    assert_eq!(status("cs_fresh").await, BookingStatus::Pending);
    assert_eq!(status("cs_paid").await, BookingStatus::Paid);

    // a second pass finds nothing left to do
    assert_eq!(expire_pending(&store, cutoff, 100).await.unwrap(), 0);
}

#[tokio::test]
async fn batch_size_bounds_one_pass() {
    let store = MemoryBookingStore::new();
    for i in 0..5 {
        store.create(&pending(&format!("cs_{i}"), 48)).await.unwrap();
    }

    let cutoff = Utc::now() - Duration::hours(24);
    assert_eq!(expire_pending(&store, cutoff, 2).await.unwrap(), 2);
    assert_eq!(expire_pending(&store, cutoff, 10).await.unwrap(), 3);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.expired, 5);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn backdated_checkout_expires() {
    let store = MemoryBookingStore::new();
    store.create(&pending("cs_1", 0)).await.unwrap();
    assert!(store.backdate("cs_1", Utc::now() - Duration::hours(25)).await);
    assert!(!store.backdate("cs_missing", Utc::now()).await);

    let cutoff = Utc::now() - Duration::hours(24);
    assert_eq!(expire_pending(&store, cutoff, 10).await.unwrap(), 1);
}
