use crate::domain::booking::{
    Anomaly, Booking, BookingStats, BookingStatus, NewAnomaly, StatusChange,
};
use crate::domain::note::{ClientNote, NewClientNote};
use crate::domain::notification::OutboxNotification;
use crate::domain::service::Service;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Durable booking records. All status mutation goes through
/// `conditional_update_status`, which applies only when the stored status
/// still equals `expected`.
#[async_trait::async_trait]
pub trait BookingStore: Send + Sync {
    async fn create(&self, booking: &Booking) -> Result<()>;

    async fn find_by_checkout_session_id(&self, checkout_session_id: &str) -> Result<Option<Booking>>;

    /// Returns `true` when this call performed the transition.
    async fn conditional_update_status(
        &self,
        checkout_session_id: &str,
        expected: BookingStatus,
        change: StatusChange,
    ) -> Result<bool>;

    async fn list_by_email(&self, user_email: &str) -> Result<Vec<Booking>>;

    async fn list(&self, status: Option<BookingStatus>, limit: i64) -> Result<Vec<Booking>>;

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Booking>>;

    /// Stores the anomaly and marks the booking (if any) as flagged.
    async fn record_anomaly(&self, anomaly: NewAnomaly) -> Result<()>;

    async fn list_open_anomalies(&self, limit: i64) -> Result<Vec<Anomaly>>;

    async fn resolve_anomaly(&self, id: i64, note: &str) -> Result<bool>;

    async fn stats(&self) -> Result<BookingStats>;

    /// Claims up to `limit` due outbox rows for delivery.
    async fn lock_pending_notifications(&self, limit: i64) -> Result<Vec<OutboxNotification>>;

    async fn mark_notification_sent(&self, id: i64) -> Result<()>;

    /// `None` gives up on the row.
    async fn mark_notification_retry(
        &self,
        id: i64,
        attempts: i32,
        next_attempt_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

#[async_trait::async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Service>>;

    async fn find_active(&self, key: &str) -> Result<Option<Service>>;

    async fn upsert(&self, service: &Service) -> Result<()>;

    /// Returns `false` when a service with the same key already exists.
    async fn insert_if_absent(&self, service: &Service) -> Result<bool>;
}

/// Notes published by an operator to a client's portal.
#[async_trait::async_trait]
pub trait NoteBook: Send + Sync {
    async fn publish(&self, note: NewClientNote) -> Result<ClientNote>;

    async fn list_for(&self, user_email: &str) -> Result<Vec<ClientNote>>;
}
