use crate::domain::notification::{Notification, OutboxNotification};
use crate::repo::booking_store::BookingStore;
use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub const MAX_DELIVERY_ATTEMPTS: i32 = 8;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

#[derive(Clone)]
pub struct MailRelayNotifier {
    pub relay_url: String,
    pub from: String,
    pub client: reqwest::Client,
}

#[async_trait::async_trait]
impl Notifier for MailRelayNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        let resp = self
            .client
            .post(&self.relay_url)
            .json(&serde_json::json!({
                "from": self.from,
                "to": n.to,
                "subject": n.kind.subject(&n.data),
                "template": n.kind,
                "data": n.data,
            }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!("mail relay responded HTTP_{}", resp.status().as_u16()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DispatchStats {
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DispatchCounts {
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// In-process queue for alerts that cannot go through the store outbox
/// because the store itself failed. Enqueueing never blocks and never fails
/// the caller.
#[derive(Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<Notification>,
    pub stats: Arc<DispatchStats>,
}

impl NotificationQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        Self::channel_with_stats(capacity, Arc::new(DispatchStats::default()))
    }

    pub fn channel_with_stats(
        capacity: usize,
        stats: Arc<DispatchStats>,
    ) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, stats }, receiver)
    }

    pub fn enqueue(&self, notification: Notification) {
        if let Err(e) = self.sender.try_send(notification) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::error!("notification dropped before dispatch: {}", e);
        }
    }
}

pub struct NotificationWorker {
    pub receiver: mpsc::Receiver<Notification>,
    pub notifier: Arc<dyn Notifier>,
    pub stats: Arc<DispatchStats>,
}

impl NotificationWorker {
    pub async fn run(mut self) {
        while let Some(n) = self.receiver.recv().await {
            match self.notifier.send(&n).await {
                Ok(()) => {
                    self.stats.sent.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(kind = ?n.kind, to = %n.to, "notification sent");
                }
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(kind = ?n.kind, to = %n.to, "notification failed: {}", e);
                }
            }
        }
        tracing::info!("notification worker stopped");
    }
}

/// Delivers outbox rows committed alongside booking changes. Rows stay in
/// the store until sent, so a crash or restart only delays them.
pub struct NotificationRelay {
    pub store: Arc<dyn BookingStore>,
    pub notifier: Arc<dyn Notifier>,
    pub stats: Arc<DispatchStats>,
    pub batch_size: i64,
    pub poll_interval: std::time::Duration,
}

impl NotificationRelay {
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if let Err(e) = self.tick().await {
                tracing::error!("notification relay error: {}", e);
            }
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        // one last pass for rows committed while the server was draining
        if let Err(e) = self.tick().await {
            tracing::error!("notification relay final pass failed: {}", e);
        }
        tracing::info!("notification relay stopped");
    }

    /// Delivers one batch; returns how many rows were attempted.
    pub async fn tick(&self) -> Result<usize> {
        let batch = self.store.lock_pending_notifications(self.batch_size).await?;
        let attempted = batch.len();
        for item in batch {
            self.deliver(item).await?;
        }
        Ok(attempted)
    }

    async fn deliver(&self, item: OutboxNotification) -> Result<()> {
        let n = &item.notification;
        match self.notifier.send(n).await {
            Ok(()) => {
                self.store.mark_notification_sent(item.id).await?;
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    outbox_id = item.id,
                    checkout_session_id = %item.checkout_session_id,
                    kind = ?n.kind,
                    "notification sent"
                );
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                let attempts = item.attempts + 1;
                let next_attempt_at = (attempts < MAX_DELIVERY_ATTEMPTS).then(|| {
                    let backoff = i64::min(300, 2_i64.pow(attempts.min(8) as u32));
                    Utc::now() + chrono::Duration::seconds(backoff)
                });
                if next_attempt_at.is_none() {
                    tracing::error!(
                        outbox_id = item.id,
                        checkout_session_id = %item.checkout_session_id,
                        kind = ?n.kind,
                        "notification abandoned after {} attempts: {}",
                        attempts,
                        e
                    );
                } else {
                    tracing::warn!(outbox_id = item.id, kind = ?n.kind, "notification failed, will retry: {}", e);
                }
                self.store
                    .mark_notification_retry(item.id, attempts, next_attempt_at)
                    .await?;
            }
        }
        Ok(())
    }
}
