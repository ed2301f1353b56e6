use crate::domain::booking::BookingStatus;
use crate::domain::checkout::err;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub user_email: String,
}

pub async fn list_customer_bookings(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> impl IntoResponse {
    match state.store.list_by_email(query.user_email.trim()).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!(items))).into_response(),
        Err(e) => internal(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn admin_list_bookings(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> impl IntoResponse {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => match BookingStatus::parse(&s.to_uppercase()) {
            Some(status) => Some(status),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(err("INVALID_STATUS", &format!("unknown status {s}"))),
                )
                    .into_response()
            }
        },
    };
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    match state.store.list(status, limit).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!(items))).into_response(),
        Err(e) => internal(e),
    }
}

pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "bookings": stats,
                "notifications": state.notification_stats.snapshot(),
                "generated_at": chrono::Utc::now(),
            })),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

pub async fn list_anomalies(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_open_anomalies(200).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!(items))).into_response(),
        Err(e) => internal(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ResolveAnomalyRequest {
    pub note: String,
}

pub async fn resolve_anomaly(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ResolveAnomalyRequest>,
) -> impl IntoResponse {
    match state.store.resolve_anomaly(id, &req.note).await {
        Ok(true) => {
            tracing::info!(anomaly_id = id, "anomaly resolved");
            (StatusCode::OK, Json(serde_json::json!({"resolved": true}))).into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(err("ANOMALY_NOT_FOUND", "open anomaly not found")),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

pub(crate) fn internal(e: anyhow::Error) -> axum::response::Response {
    tracing::error!(error = %e, "store call failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(err("INTERNAL", "store unavailable")),
    )
        .into_response()
}
