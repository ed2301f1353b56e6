use crate::domain::booking::{
    Anomaly, AnomalyKind, Booking, BookingStats, BookingStatus, NewAnomaly, PaymentStatus,
    StatusChange,
};
use crate::domain::notification::{DeliveryStatus, Notification, OutboxNotification, TemplateKind};
use crate::repo::booking_store::BookingStore;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct BookingsRepo {
    pub pool: PgPool,
}

const BOOKING_COLUMNS: &str = r#"
    booking_id, checkout_session_id, correlation_token, service_key, service_name, duration_mins,
    amount_minor, currency, user_email, status, payment_status, payment_reference, flagged,
    created_at, updated_at, paid_at
"#;

fn booking_from_row(r: &PgRow) -> Result<Booking> {
    let status: String = r.get("status");
    let payment_status: String = r.get("payment_status");
    Ok(Booking {
        booking_id: r.get("booking_id"),
        checkout_session_id: r.get("checkout_session_id"),
        correlation_token: r.get("correlation_token"),
        service_key: r.get("service_key"),
        service_name: r.get("service_name"),
        duration_mins: r.get("duration_mins"),
        amount_minor: r.get("amount_minor"),
        currency: r.get("currency"),
        user_email: r.get("user_email"),
        status: BookingStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown booking status {}", status))?,
        payment_status: PaymentStatus::parse(&payment_status)
            .ok_or_else(|| anyhow!("unknown payment status {}", payment_status))?,
        payment_reference: r.get("payment_reference"),
        flagged: r.get("flagged"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        paid_at: r.get("paid_at"),
    })
}

fn outbox_from_row(r: &PgRow) -> Result<OutboxNotification> {
    let kind: String = r.get("kind");
    let status: String = r.get("status");
    Ok(OutboxNotification {
        id: r.get("id"),
        checkout_session_id: r.get("checkout_session_id"),
        notification: Notification {
            to: r.get("recipient"),
            kind: TemplateKind::parse(&kind)
                .ok_or_else(|| anyhow!("unknown notification kind {}", kind))?,
            data: r.get("data"),
        },
        status: DeliveryStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown delivery status {}", status))?,
        attempts: r.get("attempts"),
    })
}

fn anomaly_from_row(r: &PgRow) -> Result<Anomaly> {
    let kind: String = r.get("kind");
    Ok(Anomaly {
        id: r.get("id"),
        checkout_session_id: r.get("checkout_session_id"),
        event_id: r.get("event_id"),
        kind: AnomalyKind::parse(&kind).ok_or_else(|| anyhow!("unknown anomaly kind {}", kind))?,
        expected_amount: r.get("expected_amount"),
        confirmed_amount: r.get("confirmed_amount"),
        details: r.get("details"),
        resolved: r.get("resolved"),
        resolution_note: r.get("resolution_note"),
        created_at: r.get("created_at"),
        resolved_at: r.get("resolved_at"),
    })
}

#[async_trait::async_trait]
impl BookingStore for BookingsRepo {
    async fn create(&self, b: &Booking) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                booking_id, checkout_session_id, correlation_token, service_key, service_name,
                duration_mins, amount_minor, currency, user_email, status, payment_status,
                flagged, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9, $10, $11,
                false, $12, $12
            )
            "#,
        )
        .bind(b.booking_id)
        .bind(&b.checkout_session_id)
        .bind(b.correlation_token)
        .bind(&b.service_key)
        .bind(&b.service_name)
        .bind(b.duration_mins)
        .bind(b.amount_minor)
        .bind(&b.currency)
        .bind(&b.user_email)
        .bind(b.status.as_str())
        .bind(b.payment_status.as_str())
        .bind(b.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_checkout_session_id(&self, checkout_session_id: &str) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE checkout_session_id = $1"
        ))
        .bind(checkout_session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn conditional_update_status(
        &self,
        checkout_session_id: &str,
        expected: BookingStatus,
        change: StatusChange,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $3,
                payment_status = $4,
                payment_reference = COALESCE($5, payment_reference),
                paid_at = COALESCE($6, paid_at),
                updated_at = now()
            WHERE checkout_session_id = $1 AND status = $2
            "#,
        )
        .bind(checkout_session_id)
        .bind(expected.as_str())
        .bind(change.status.as_str())
        .bind(change.payment_status.as_str())
        .bind(&change.payment_reference)
        .bind(change.paid_at)
        .execute(tx.as_mut())
        .await?;

        if res.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        for n in &change.notifications {
            sqlx::query(
                r#"
                INSERT INTO notification_outbox (checkout_session_id, kind, recipient, data)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(checkout_session_id)
            .bind(n.kind.as_str())
            .bind(&n.to)
            .bind(&n.data)
            .execute(tx.as_mut())
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn list_by_email(&self, user_email: &str) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_email = $1 ORDER BY created_at DESC"
        ))
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn list(&self, status: Option<BookingStatus>, limit: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE status = 'PENDING' AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#
        ))
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn record_anomaly(&self, a: NewAnomaly) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO booking_anomalies (
                checkout_session_id, event_id, kind, expected_amount, confirmed_amount, details
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (checkout_session_id, kind, event_id) DO NOTHING
            "#,
        )
        .bind(&a.checkout_session_id)
        .bind(&a.event_id)
        .bind(a.kind.as_str())
        .bind(a.expected_amount)
        .bind(a.confirmed_amount)
        .bind(&a.details)
        .execute(tx.as_mut())
        .await?;

        sqlx::query("UPDATE bookings SET flagged = true, updated_at = now() WHERE checkout_session_id = $1")
            .bind(&a.checkout_session_id)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_open_anomalies(&self, limit: i64) -> Result<Vec<Anomaly>> {
        let rows = sqlx::query(
            r#"
            SELECT id, checkout_session_id, event_id, kind, expected_amount, confirmed_amount,
                   details, resolved, resolution_note, created_at, resolved_at
            FROM booking_anomalies
            WHERE resolved = false
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(anomaly_from_row).collect()
    }

    async fn resolve_anomaly(&self, id: i64, note: &str) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE booking_anomalies
            SET resolved = true, resolution_note = $2, resolved_at = now()
            WHERE id = $1 AND resolved = false
            "#,
        )
        .bind(id)
        .bind(note)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn stats(&self) -> Result<BookingStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE status = 'PAID') AS paid,
                COUNT(*) FILTER (WHERE status = 'FAILED') AS failed,
                COUNT(*) FILTER (WHERE status = 'EXPIRED') AS expired,
                COALESCE(SUM(amount_minor) FILTER (WHERE status = 'PAID'), 0)::BIGINT AS paid_revenue_minor,
                COUNT(*) FILTER (WHERE flagged) AS flagged,
                (SELECT COUNT(*) FROM booking_anomalies WHERE resolved = false) AS open_anomalies,
                (SELECT COUNT(*) FROM notification_outbox WHERE status IN ('PENDING', 'PROCESSING')) AS unsent_notifications
            FROM bookings
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(BookingStats {
            pending: row.get("pending"),
            paid: row.get("paid"),
            failed: row.get("failed"),
            expired: row.get("expired"),
            paid_revenue_minor: row.get("paid_revenue_minor"),
            flagged: row.get("flagged"),
            open_anomalies: row.get("open_anomalies"),
            unsent_notifications: row.get("unsent_notifications"),
        })
    }

    async fn lock_pending_notifications(&self, limit: i64) -> Result<Vec<OutboxNotification>> {
        let mut tx = self.pool.begin().await?;
        // PROCESSING rows older than five minutes belong to a relay that died mid-batch.
        let rows = sqlx::query(
            r#"
            SELECT id, checkout_session_id, kind, recipient, data, status, attempts
            FROM notification_outbox
            WHERE (status = 'PENDING' AND next_attempt_at <= now())
               OR (status = 'PROCESSING' AND updated_at < now() - interval '5 minutes')
            ORDER BY id ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(tx.as_mut())
        .await?;

        if rows.is_empty() {
            tx.rollback().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.get("id")).collect();
        sqlx::query("UPDATE notification_outbox SET status = 'PROCESSING', updated_at = now() WHERE id = ANY($1)")
            .bind(&ids)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;

        rows.iter()
            .map(|r| {
                outbox_from_row(r).map(|mut item| {
                    item.status = DeliveryStatus::Processing;
                    item
                })
            })
            .collect()
    }

    async fn mark_notification_sent(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE notification_outbox SET status = 'SENT', sent_at = now(), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_notification_retry(
        &self,
        id: i64,
        attempts: i32,
        next_attempt_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let status = match next_attempt_at {
            Some(_) => DeliveryStatus::Pending,
            None => DeliveryStatus::Failed,
        };
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET status = $2, attempts = $3, next_attempt_at = COALESCE($4, next_attempt_at), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(attempts)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
