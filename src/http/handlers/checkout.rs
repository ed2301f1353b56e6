use crate::domain::checkout::{err, CreateCheckoutRequest, ErrorEnvelope, RedirectTargets};
use crate::service::checkout_coordinator::CheckoutError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

pub async fn create_checkout(
    State(state): State<AppState>,
    Json(req): Json<CreateCheckoutRequest>,
) -> impl IntoResponse {
    let redirects = RedirectTargets {
        success_url: req.success_url,
        cancel_url: req.cancel_url,
    };
    match state
        .coordinator
        .initiate_checkout(&req.service_key, &req.user_email, redirects)
        .await
    {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            let (status, body) = checkout_error(&e);
            (status, Json(body)).into_response()
        }
    }
}

pub async fn get_checkout_session(
    State(state): State<AppState>,
    Path(checkout_session_id): Path<String>,
) -> impl IntoResponse {
    match state.store.find_by_checkout_session_id(&checkout_session_id).await {
        Ok(Some(booking)) => (StatusCode::OK, Json(serde_json::json!(booking))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!(err("BOOKING_NOT_FOUND", "no booking for checkout session"))),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!(err("INTERNAL_ERROR", &e.to_string()))),
        )
            .into_response(),
    }
}

fn checkout_error(e: &CheckoutError) -> (StatusCode, ErrorEnvelope) {
    match e {
        CheckoutError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, err("INVALID_REQUEST", msg)),
        CheckoutError::ServiceNotFound(key) => (
            StatusCode::NOT_FOUND,
            err("SERVICE_NOT_FOUND", &format!("no active service with key {key}")),
        ),
        CheckoutError::GatewayUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            err("GATEWAY_UNAVAILABLE", "payment provider unavailable, please try again"),
        ),
        CheckoutError::StoreUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            err("STORE_UNAVAILABLE", "booking service unavailable, please try again"),
        ),
        CheckoutError::PersistenceFailure { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            err(
                "BOOKING_NOT_SAVED",
                "your booking could not be recorded, please contact support before retrying",
            ),
        ),
    }
}
