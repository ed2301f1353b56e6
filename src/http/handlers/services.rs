use crate::domain::checkout::err;
use crate::domain::service::Service;
use crate::http::handlers::bookings::internal;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

pub async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.list_active().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!(items))).into_response(),
        Err(e) => internal(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub duration_mins: i32,
    pub active: Option<bool>,
}

pub async fn upsert_service(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<UpsertServiceRequest>,
) -> impl IntoResponse {
    let service = Service {
        key,
        name: req.name,
        description: req.description,
        price_minor: req.price_minor,
        duration_mins: req.duration_mins,
        active: req.active.unwrap_or(true),
    };
    if let Err(msg) = service.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(err("INVALID_SERVICE", &msg)),
        )
            .into_response();
    }

    match state.catalog.upsert(&service).await {
        Ok(()) => {
            tracing::info!(key = %service.key, price_minor = service.price_minor, "service upserted");
            (StatusCode::OK, Json(serde_json::json!(service))).into_response()
        }
        Err(e) => internal(e),
    }
}
