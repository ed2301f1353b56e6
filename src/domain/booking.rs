use crate::domain::notification::Notification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Paid,
    Failed,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Paid => "PAID",
            BookingStatus::Failed => "FAILED",
            BookingStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "PAID" => Some(BookingStatus::Paid),
            "FAILED" => Some(BookingStatus::Failed),
            "EXPIRED" => Some(BookingStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Paid => "PAID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(PaymentStatus::Unpaid),
            "PAID" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: Uuid,
    pub checkout_session_id: String,
    pub correlation_token: Uuid,
    pub service_key: String,
    pub service_name: String,
    pub duration_mins: i32,
    pub amount_minor: i64,
    pub currency: String,
    pub user_email: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub flagged: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Fields written by a won conditional update. `notifications` are queued
/// for delivery in the same write, so they exist exactly when the change does.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notifications: Vec<Notification>,
}

impl StatusChange {
    pub fn paid(payment_reference: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: BookingStatus::Paid,
            payment_status: PaymentStatus::Paid,
            payment_reference,
            paid_at: Some(at),
            notifications: Vec::new(),
        }
    }

    pub fn with_notifications(mut self, notifications: Vec<Notification>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn expired() -> Self {
        Self {
            status: BookingStatus::Expired,
            payment_status: PaymentStatus::Unpaid,
            payment_reference: None,
            paid_at: None,
            notifications: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    AmountMismatch,
    UnknownSession,
    LateConfirmation,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::AmountMismatch => "AMOUNT_MISMATCH",
            AnomalyKind::UnknownSession => "UNKNOWN_SESSION",
            AnomalyKind::LateConfirmation => "LATE_CONFIRMATION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AMOUNT_MISMATCH" => Some(AnomalyKind::AmountMismatch),
            "UNKNOWN_SESSION" => Some(AnomalyKind::UnknownSession),
            "LATE_CONFIRMATION" => Some(AnomalyKind::LateConfirmation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAnomaly {
    pub checkout_session_id: String,
    pub event_id: Option<String>,
    pub kind: AnomalyKind,
    pub expected_amount: Option<i64>,
    pub confirmed_amount: Option<i64>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub id: i64,
    pub checkout_session_id: String,
    pub event_id: Option<String>,
    pub kind: AnomalyKind,
    pub expected_amount: Option<i64>,
    pub confirmed_amount: Option<i64>,
    pub details: serde_json::Value,
    pub resolved: bool,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BookingStats {
    pub pending: i64,
    pub paid: i64,
    pub failed: i64,
    pub expired: i64,
    pub paid_revenue_minor: i64,
    pub flagged: i64,
    pub open_anomalies: i64,
    pub unsent_notifications: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_stored_values_do_not_parse() {
        assert_eq!(PaymentStatus::parse("PAID"), Some(PaymentStatus::Paid));
        assert_eq!(PaymentStatus::parse("UNPAID"), Some(PaymentStatus::Unpaid));
        assert_eq!(PaymentStatus::parse("REFUNDED"), None);
        assert_eq!(PaymentStatus::parse("paid"), None);
        assert_eq!(BookingStatus::parse("CANCELLED"), None);
        assert_eq!(AnomalyKind::parse("AMOUNT_MISMATCH"), Some(AnomalyKind::AmountMismatch));
    }
}
