use crate::domain::booking::{
    Anomaly, Booking, BookingStats, BookingStatus, NewAnomaly, StatusChange,
};
use crate::domain::note::{ClientNote, NewClientNote};
use crate::domain::notification::{DeliveryStatus, OutboxNotification};
use crate::domain::service::Service;
use crate::repo::booking_store::{BookingStore, NoteBook, ServiceCatalog};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct OutboxRow {
    item: OutboxNotification,
    next_attempt_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    bookings: HashMap<String, Booking>,
    anomalies: Vec<Anomaly>,
    outbox: Vec<OutboxRow>,
}

/// Process-local `BookingStore` with the same conditional-update contract
/// as the Postgres repo.
#[derive(Clone, Default)]
pub struct MemoryBookingStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites `created_at`; lets sweeps be exercised without waiting.
    pub async fn backdate(&self, checkout_session_id: &str, created_at: DateTime<Utc>) -> bool {
        let mut tables = self.inner.write().await;
        match tables.bookings.get_mut(checkout_session_id) {
            Some(b) => {
                b.created_at = created_at;
                true
            }
            None => false,
        }
    }

    /// Every outbox row in insertion order, whatever its delivery state.
    pub async fn outbox(&self) -> Vec<OutboxNotification> {
        self.inner
            .read()
            .await
            .outbox
            .iter()
            .map(|row| row.item.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl BookingStore for MemoryBookingStore {
    async fn create(&self, booking: &Booking) -> Result<()> {
        let mut tables = self.inner.write().await;
        if tables.bookings.contains_key(&booking.checkout_session_id) {
            return Err(anyhow!(
                "duplicate checkout_session_id {}",
                booking.checkout_session_id
            ));
        }
        tables
            .bookings
            .insert(booking.checkout_session_id.clone(), booking.clone());
        Ok(())
    }

    async fn find_by_checkout_session_id(&self, checkout_session_id: &str) -> Result<Option<Booking>> {
        Ok(self.inner.read().await.bookings.get(checkout_session_id).cloned())
    }

    async fn conditional_update_status(
        &self,
        checkout_session_id: &str,
        expected: BookingStatus,
        change: StatusChange,
    ) -> Result<bool> {
        let mut tables = self.inner.write().await;
        let Some(b) = tables.bookings.get_mut(checkout_session_id) else {
            return Ok(false);
        };
        if b.status != expected {
            return Ok(false);
        }

        b.status = change.status;
        b.payment_status = change.payment_status;
        if change.payment_reference.is_some() {
            b.payment_reference = change.payment_reference;
        }
        if change.paid_at.is_some() {
            b.paid_at = change.paid_at;
        }
        let now = Utc::now();
        b.updated_at = now;

        for notification in change.notifications {
            let id = tables.outbox.len() as i64 + 1;
            tables.outbox.push(OutboxRow {
                item: OutboxNotification {
                    id,
                    checkout_session_id: checkout_session_id.to_string(),
                    notification,
                    status: DeliveryStatus::Pending,
                    attempts: 0,
                },
                next_attempt_at: now,
            });
        }
        Ok(true)
    }

    async fn list_by_email(&self, user_email: &str) -> Result<Vec<Booking>> {
        let tables = self.inner.read().await;
        let mut out: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.user_email == user_email)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn list(&self, status: Option<BookingStatus>, limit: i64) -> Result<Vec<Booking>> {
        let tables = self.inner.read().await;
        let mut out: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Booking>> {
        let tables = self.inner.read().await;
        let mut out: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn record_anomaly(&self, a: NewAnomaly) -> Result<()> {
        let mut tables = self.inner.write().await;
        let duplicate = tables.anomalies.iter().any(|x| {
            x.checkout_session_id == a.checkout_session_id
                && x.kind == a.kind
                && x.event_id.is_some()
                && x.event_id == a.event_id
        });
        if !duplicate {
            let id = tables.anomalies.len() as i64 + 1;
            tables.anomalies.push(Anomaly {
                id,
                checkout_session_id: a.checkout_session_id.clone(),
                event_id: a.event_id,
                kind: a.kind,
                expected_amount: a.expected_amount,
                confirmed_amount: a.confirmed_amount,
                details: a.details,
                resolved: false,
                resolution_note: None,
                created_at: Utc::now(),
                resolved_at: None,
            });
        }
        if let Some(b) = tables.bookings.get_mut(&a.checkout_session_id) {
            b.flagged = true;
            b.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_open_anomalies(&self, limit: i64) -> Result<Vec<Anomaly>> {
        let tables = self.inner.read().await;
        Ok(tables
            .anomalies
            .iter()
            .filter(|a| !a.resolved)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn resolve_anomaly(&self, id: i64, note: &str) -> Result<bool> {
        let mut tables = self.inner.write().await;
        match tables.anomalies.iter_mut().find(|a| a.id == id && !a.resolved) {
            Some(a) => {
                a.resolved = true;
                a.resolution_note = Some(note.to_string());
                a.resolved_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn stats(&self) -> Result<BookingStats> {
        let tables = self.inner.read().await;
        let mut stats = BookingStats::default();
        for b in tables.bookings.values() {
            match b.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::Paid => {
                    stats.paid += 1;
                    stats.paid_revenue_minor += b.amount_minor;
                }
                BookingStatus::Failed => stats.failed += 1,
                BookingStatus::Expired => stats.expired += 1,
            }
            if b.flagged {
                stats.flagged += 1;
            }
        }
        stats.open_anomalies = tables.anomalies.iter().filter(|a| !a.resolved).count() as i64;
        stats.unsent_notifications = tables
            .outbox
            .iter()
            .filter(|r| matches!(r.item.status, DeliveryStatus::Pending | DeliveryStatus::Processing))
            .count() as i64;
        Ok(stats)
    }

    async fn lock_pending_notifications(&self, limit: i64) -> Result<Vec<OutboxNotification>> {
        let mut tables = self.inner.write().await;
        let now = Utc::now();
        let mut claimed = Vec::new();
        for row in tables.outbox.iter_mut() {
            if claimed.len() as i64 >= limit {
                break;
            }
            if row.item.status == DeliveryStatus::Pending && row.next_attempt_at <= now {
                row.item.status = DeliveryStatus::Processing;
                claimed.push(row.item.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_notification_sent(&self, id: i64) -> Result<()> {
        let mut tables = self.inner.write().await;
        if let Some(row) = tables.outbox.iter_mut().find(|r| r.item.id == id) {
            row.item.status = DeliveryStatus::Sent;
        }
        Ok(())
    }

    async fn mark_notification_retry(
        &self,
        id: i64,
        attempts: i32,
        next_attempt_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut tables = self.inner.write().await;
        if let Some(row) = tables.outbox.iter_mut().find(|r| r.item.id == id) {
            row.item.attempts = attempts;
            match next_attempt_at {
                Some(at) => {
                    row.item.status = DeliveryStatus::Pending;
                    row.next_attempt_at = at;
                }
                None => row.item.status = DeliveryStatus::Failed,
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryCatalog {
    inner: Arc<RwLock<HashMap<String, Service>>>,
}

impl MemoryCatalog {
    pub fn with_services(services: Vec<Service>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(
                services.into_iter().map(|s| (s.key.clone(), s)).collect(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl ServiceCatalog for MemoryCatalog {
    async fn list_active(&self) -> Result<Vec<Service>> {
        let mut out: Vec<Service> = self
            .inner
            .read()
            .await
            .values()
            .filter(|s| s.active)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.price_minor);
        Ok(out)
    }

    async fn find_active(&self, key: &str) -> Result<Option<Service>> {
        Ok(self.inner.read().await.get(key).filter(|s| s.active).cloned())
    }

    async fn upsert(&self, service: &Service) -> Result<()> {
        self.inner
            .write()
            .await
            .insert(service.key.clone(), service.clone());
        Ok(())
    }

    async fn insert_if_absent(&self, service: &Service) -> Result<bool> {
        let mut map = self.inner.write().await;
        if map.contains_key(&service.key) {
            return Ok(false);
        }
        map.insert(service.key.clone(), service.clone());
        Ok(true)
    }
}

#[derive(Clone, Default)]
pub struct MemoryNoteBook {
    inner: Arc<RwLock<Vec<ClientNote>>>,
}

#[async_trait::async_trait]
impl NoteBook for MemoryNoteBook {
    async fn publish(&self, note: NewClientNote) -> Result<ClientNote> {
        let mut notes = self.inner.write().await;
        let stored = ClientNote {
            id: notes.len() as i64 + 1,
            user_email: note.user_email,
            title: note.title,
            content: note.content,
            created_at: Utc::now(),
        };
        notes.push(stored.clone());
        Ok(stored)
    }

    async fn list_for(&self, user_email: &str) -> Result<Vec<ClientNote>> {
        let notes = self.inner.read().await;
        Ok(notes
            .iter()
            .rev()
            .filter(|n| n.user_email == user_email)
            .cloned()
            .collect())
    }
}
