use crate::domain::checkout::err;
use crate::service::checkout_coordinator::ReconcileError;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok());

    match state.coordinator.reconcile(&body, signature).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({"received": true, "outcome": outcome.label()})),
        )
            .into_response(),
        Err(ReconcileError::SignatureInvalid) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!(err(
                "SIGNATURE_INVALID",
                "webhook signature verification failed"
            ))),
        )
            .into_response(),
        Err(ReconcileError::MalformedPayload(msg)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!(err("MALFORMED_PAYLOAD", &msg))),
        )
            .into_response(),
        Err(ReconcileError::PersistenceFailure(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!(err(
                "NOT_COMMITTED",
                "event not applied, redeliver"
            ))),
        )
            .into_response(),
    }
}
