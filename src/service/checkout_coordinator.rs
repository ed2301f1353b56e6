use crate::domain::booking::{
    AnomalyKind, Booking, BookingStatus, NewAnomaly, PaymentStatus, StatusChange,
};
use crate::domain::checkout::{
    CheckoutResponse, CompletedSession, GatewayEvent, RedirectTargets, CHECKOUT_COMPLETED,
};
use crate::domain::notification::{booking_ref, Notification, TemplateKind};
use crate::gateways::{PaymentGateway, SessionRequest};
use crate::repo::booking_store::{BookingStore, ServiceCatalog};
use crate::service::notification_dispatcher::NotificationQueue;
use crate::service::signature::WebhookVerifier;
use anyhow::anyhow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("service not found: {0}")]
    ServiceNotFound(String),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("booking store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("checkout session {checkout_session_id} created but booking not saved: {reason}")]
    PersistenceFailure {
        checkout_session_id: String,
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("webhook signature verification failed")]
    SignatureInvalid,
    #[error("malformed event payload: {0}")]
    MalformedPayload(String),
    #[error("reconciliation not committed: {0}")]
    PersistenceFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    Applied { checkout_session_id: String },
    AlreadyApplied { checkout_session_id: String },
    BookingNotFound { checkout_session_id: String },
    AmountMismatch {
        checkout_session_id: String,
        expected_minor: i64,
        confirmed_minor: Option<i64>,
    },
    LateConfirmation {
        checkout_session_id: String,
        status: BookingStatus,
    },
    Ignored { event_type: String },
}

impl ReconciliationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReconciliationOutcome::Applied { .. } => "applied",
            ReconciliationOutcome::AlreadyApplied { .. } => "already_applied",
            ReconciliationOutcome::BookingNotFound { .. } => "booking_not_found",
            ReconciliationOutcome::AmountMismatch { .. } => "amount_mismatch",
            ReconciliationOutcome::LateConfirmation { .. } => "late_confirmation",
            ReconciliationOutcome::Ignored { .. } => "ignored",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub public_base_url: String,
    pub operator_email: String,
    pub store_timeout: Duration,
}

#[derive(Clone)]
pub struct CheckoutCoordinator {
    pub catalog: Arc<dyn ServiceCatalog>,
    pub store: Arc<dyn BookingStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub verifier: WebhookVerifier,
    pub alerts: NotificationQueue,
    pub settings: CheckoutSettings,
}

impl CheckoutCoordinator {
    pub async fn initiate_checkout(
        &self,
        service_key: &str,
        customer_email: &str,
        redirects: RedirectTargets,
    ) -> Result<CheckoutResponse, CheckoutError> {
        let customer_email = customer_email.trim();
        validate_checkout_input(service_key, customer_email)?;

        let service = self
            .bounded(self.catalog.find_active(service_key))
            .await
            .map_err(|e| CheckoutError::StoreUnavailable(e.to_string()))?
            .ok_or_else(|| CheckoutError::ServiceNotFound(service_key.to_string()))?;

        let correlation_token = Uuid::new_v4();
        let base = self.settings.public_base_url.trim_end_matches('/');
        let session_request = SessionRequest {
            amount_minor: service.price_minor,
            currency: self.settings.currency.clone(),
            product_name: service.name.clone(),
            product_description: format!("{}-minute {}", service.duration_mins, service.name),
            customer_email: customer_email.to_string(),
            metadata: vec![
                ("serviceKey".to_string(), service.key.clone()),
                ("correlationToken".to_string(), correlation_token.to_string()),
                ("serviceName".to_string(), service.name.clone()),
                ("durationMins".to_string(), service.duration_mins.to_string()),
            ],
            success_url: redirects
                .success_url
                .unwrap_or_else(|| format!("{base}/success?session_id={{CHECKOUT_SESSION_ID}}")),
            cancel_url: redirects.cancel_url.unwrap_or_else(|| base.to_string()),
        };

        let created = self
            .gateway
            .create_session(session_request)
            .await
            .map_err(|e| {
                tracing::warn!(
                    gateway = self.gateway.name(),
                    service_key = %service.key,
                    "checkout session creation failed: {}",
                    e
                );
                CheckoutError::GatewayUnavailable(e.to_string())
            })?;

        let now = chrono::Utc::now();
        let booking = Booking {
            booking_id: Uuid::new_v4(),
            checkout_session_id: created.id.clone(),
            correlation_token,
            service_key: service.key.clone(),
            service_name: service.name.clone(),
            duration_mins: service.duration_mins,
            amount_minor: service.price_minor,
            currency: self.settings.currency.clone(),
            user_email: customer_email.to_string(),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_reference: None,
            flagged: false,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };

        if let Err(e) = self.bounded(self.store.create(&booking)).await {
            tracing::error!(
                checkout_session_id = %created.id,
                correlation_token = %correlation_token,
                service_key = %service.key,
                amount_minor = service.price_minor,
                user_email = %customer_email,
                "booking not persisted after gateway session was created, manual reconciliation required: {}",
                e
            );
            self.alerts.enqueue(Notification {
                to: self.settings.operator_email.clone(),
                kind: TemplateKind::OperatorPersistenceAlert,
                data: serde_json::json!({
                    "checkout_session_id": created.id,
                    "correlation_token": correlation_token,
                    "service_key": service.key,
                    "service_name": service.name,
                    "amount": format_amount(service.price_minor),
                    "customer_email": customer_email,
                    "error": e.to_string(),
                }),
            });
            return Err(CheckoutError::PersistenceFailure {
                checkout_session_id: created.id,
                reason: e.to_string(),
            });
        }

        tracing::info!(
            checkout_session_id = %booking.checkout_session_id,
            service_key = %booking.service_key,
            amount_minor = booking.amount_minor,
            "checkout session created"
        );

        Ok(CheckoutResponse {
            checkout_url: created.url,
            checkout_session_id: created.id,
        })
    }

    pub async fn reconcile(
        &self,
        raw_payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let header = signature_header.ok_or_else(|| {
            tracing::warn!("webhook rejected");
            ReconcileError::SignatureInvalid
        })?;
        self.verifier.verify(raw_payload, header).map_err(|_| {
            tracing::warn!("webhook rejected");
            ReconcileError::SignatureInvalid
        })?;

        let value: serde_json::Value = serde_json::from_slice(raw_payload)
            .map_err(|e| ReconcileError::MalformedPayload(e.to_string()))?;
        let event_type = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        if event_type != CHECKOUT_COMPLETED {
            tracing::info!(event_type = %event_type, "webhook event ignored");
            return Ok(ReconciliationOutcome::Ignored { event_type });
        }

        let event: GatewayEvent = serde_json::from_value(value)
            .map_err(|e| ReconcileError::MalformedPayload(e.to_string()))?;
        self.apply_completed(&event.id, &event.data.object).await
    }

    async fn apply_completed(
        &self,
        event_id: &str,
        session: &CompletedSession,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let checkout_session_id = session.id.clone();

        let booking = self
            .bounded(self.store.find_by_checkout_session_id(&checkout_session_id))
            .await
            .map_err(persistence)?;

        let Some(booking) = booking else {
            tracing::warn!(
                checkout_session_id = %checkout_session_id,
                event_id = %event_id,
                "completion event for unknown checkout session"
            );
            self.flag(NewAnomaly {
                checkout_session_id: checkout_session_id.clone(),
                event_id: Some(event_id.to_string()),
                kind: AnomalyKind::UnknownSession,
                expected_amount: None,
                confirmed_amount: session.amount_total,
                details: serde_json::json!({
                    "customer_email": session.contact_email(),
                    "metadata": session.metadata,
                }),
            })
            .await?;
            return Ok(ReconciliationOutcome::BookingNotFound { checkout_session_id });
        };

        match booking.status {
            BookingStatus::Paid => {
                tracing::info!(checkout_session_id = %checkout_session_id, "completion already applied");
                return Ok(ReconciliationOutcome::AlreadyApplied { checkout_session_id });
            }
            BookingStatus::Pending => {}
            status => return self.late_confirmation(event_id, session, &booking, status).await,
        }

        let currency_ok = session
            .currency
            .as_deref()
            .map_or(true, |c| c.eq_ignore_ascii_case(&booking.currency));
        if session.amount_total != Some(booking.amount_minor) || !currency_ok {
            tracing::warn!(
                checkout_session_id = %checkout_session_id,
                expected_minor = booking.amount_minor,
                confirmed_minor = ?session.amount_total,
                confirmed_currency = ?session.currency,
                "confirmed amount does not match booking, flagged for review"
            );
            self.flag(NewAnomaly {
                checkout_session_id: checkout_session_id.clone(),
                event_id: Some(event_id.to_string()),
                kind: AnomalyKind::AmountMismatch,
                expected_amount: Some(booking.amount_minor),
                confirmed_amount: session.amount_total,
                details: serde_json::json!({
                    "expected_currency": booking.currency,
                    "confirmed_currency": session.currency,
                    "payment_reference": session.payment_intent,
                }),
            })
            .await?;
            return Ok(ReconciliationOutcome::AmountMismatch {
                checkout_session_id,
                expected_minor: booking.amount_minor,
                confirmed_minor: session.amount_total,
            });
        }

        let paid_at = chrono::Utc::now();
        let change = StatusChange::paid(session.payment_intent.clone(), paid_at)
            .with_notifications(self.paid_notifications(&booking, session));
        let won = self
            .bounded(self.store.conditional_update_status(
                &checkout_session_id,
                BookingStatus::Pending,
                change,
            ))
            .await
            .map_err(persistence)?;

        if !won {
            let current = self
                .bounded(self.store.find_by_checkout_session_id(&checkout_session_id))
                .await
                .map_err(persistence)?;
            return match current {
                Some(b) if b.status == BookingStatus::Paid => {
                    tracing::info!(checkout_session_id = %checkout_session_id, "concurrent delivery already applied");
                    Ok(ReconciliationOutcome::AlreadyApplied { checkout_session_id })
                }
                Some(b) => self.late_confirmation(event_id, session, &b, b.status).await,
                None => Err(ReconcileError::PersistenceFailure(format!(
                    "booking {checkout_session_id} vanished during reconciliation"
                ))),
            };
        }

        tracing::info!(
            checkout_session_id = %checkout_session_id,
            event_id = %event_id,
            amount_minor = booking.amount_minor,
            "booking marked paid, confirmations queued"
        );

        Ok(ReconciliationOutcome::Applied { checkout_session_id })
    }

    async fn late_confirmation(
        &self,
        event_id: &str,
        session: &CompletedSession,
        booking: &Booking,
        status: BookingStatus,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        tracing::warn!(
            checkout_session_id = %booking.checkout_session_id,
            status = status.as_str(),
            "payment confirmed for a booking that is no longer pending, flagged for review"
        );
        self.flag(NewAnomaly {
            checkout_session_id: booking.checkout_session_id.clone(),
            event_id: Some(event_id.to_string()),
            kind: AnomalyKind::LateConfirmation,
            expected_amount: Some(booking.amount_minor),
            confirmed_amount: session.amount_total,
            details: serde_json::json!({
                "booking_status": status.as_str(),
                "payment_reference": session.payment_intent,
            }),
        })
        .await?;
        Ok(ReconciliationOutcome::LateConfirmation {
            checkout_session_id: booking.checkout_session_id.clone(),
            status,
        })
    }

    async fn flag(&self, anomaly: NewAnomaly) -> Result<(), ReconcileError> {
        self.bounded(self.store.record_anomaly(anomaly))
            .await
            .map_err(persistence)
    }

    /// Customer confirmation and operator alert, committed with the PAID write.
    fn paid_notifications(&self, booking: &Booking, session: &CompletedSession) -> Vec<Notification> {
        let customer = session
            .contact_email()
            .unwrap_or(booking.user_email.as_str())
            .to_string();
        let data = serde_json::json!({
            "booking_ref": booking_ref(&booking.checkout_session_id),
            "checkout_session_id": booking.checkout_session_id,
            "customer_name": session.customer_name().unwrap_or("Valued Client"),
            "customer_email": customer,
            "service_name": booking.service_name,
            "duration_mins": booking.duration_mins,
            "amount": format_amount(booking.amount_minor),
            "currency": booking.currency,
            "payment_reference": session.payment_intent,
        });

        vec![
            Notification {
                to: customer,
                kind: TemplateKind::BookingConfirmation,
                data: data.clone(),
            },
            Notification {
                to: self.settings.operator_email.clone(),
                kind: TemplateKind::OperatorPaymentAlert,
                data,
            },
        ]
    }

    async fn bounded<T>(&self, fut: impl Future<Output = anyhow::Result<T>>) -> anyhow::Result<T> {
        tokio::time::timeout(self.settings.store_timeout, fut)
            .await
            .map_err(|_| anyhow!("store call exceeded {:?}", self.settings.store_timeout))?
    }
}

fn validate_checkout_input(service_key: &str, customer_email: &str) -> Result<(), CheckoutError> {
    if service_key.trim().is_empty() {
        return Err(CheckoutError::InvalidRequest("service_key is required".to_string()));
    }
    let valid_email = customer_email
        .split_once('@')
        .map_or(false, |(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(CheckoutError::InvalidRequest(
            "user_email must be a valid email address".to_string(),
        ));
    }
    Ok(())
}

fn persistence(e: anyhow::Error) -> ReconcileError {
    tracing::error!("reconciliation store call failed: {}", e);
    ReconcileError::PersistenceFailure(e.to_string())
}

pub fn format_amount(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minor_units() {
        assert_eq!(format_amount(8500), "85.00");
        assert_eq!(format_amount(4599), "45.99");
        assert_eq!(format_amount(5), "0.05");
    }

    #[test]
    fn rejects_bad_checkout_input() {
        assert!(matches!(
            validate_checkout_input("", "alice@example.com"),
            Err(CheckoutError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_checkout_input("personal-tarot", "alice"),
            Err(CheckoutError::InvalidRequest(_))
        ));
        assert!(validate_checkout_input("personal-tarot", "alice@example.com").is_ok());
    }
}
