use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    BookingConfirmation,
    OperatorPaymentAlert,
    OperatorPersistenceAlert,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::BookingConfirmation => "booking_confirmation",
            TemplateKind::OperatorPaymentAlert => "operator_payment_alert",
            TemplateKind::OperatorPersistenceAlert => "operator_persistence_alert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "booking_confirmation" => Some(TemplateKind::BookingConfirmation),
            "operator_payment_alert" => Some(TemplateKind::OperatorPaymentAlert),
            "operator_persistence_alert" => Some(TemplateKind::OperatorPersistenceAlert),
            _ => None,
        }
    }

    pub fn subject(&self, data: &serde_json::Value) -> String {
        let service = data
            .get("service_name")
            .and_then(|v| v.as_str())
            .unwrap_or("Consultation");
        match self {
            TemplateKind::BookingConfirmation => format!(
                "Session Confirmed - {}",
                data.get("booking_ref").and_then(|v| v.as_str()).unwrap_or("")
            ),
            TemplateKind::OperatorPaymentAlert => format!("Payment Received - {service}"),
            TemplateKind::OperatorPersistenceAlert => {
                format!("ACTION REQUIRED: booking not saved - {service}")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub to: String,
    pub kind: TemplateKind,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Processing => "PROCESSING",
            DeliveryStatus::Sent => "SENT",
            DeliveryStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(DeliveryStatus::Pending),
            "PROCESSING" => Some(DeliveryStatus::Processing),
            "SENT" => Some(DeliveryStatus::Sent),
            "FAILED" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

/// A notification committed in the same write as the booking change that
/// produced it, delivered later by the relay.
#[derive(Debug, Clone, Serialize)]
pub struct OutboxNotification {
    pub id: i64,
    pub checkout_session_id: String,
    pub notification: Notification,
    pub status: DeliveryStatus,
    pub attempts: i32,
}

/// Short customer-facing reference derived from the checkout session id.
pub fn booking_ref(checkout_session_id: &str) -> String {
    let tail: String = checkout_session_id
        .chars()
        .rev()
        .take(8)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    tail.to_uppercase()
}
