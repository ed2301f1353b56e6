use crate::domain::checkout::err;
use crate::domain::note::PublishNoteRequest;
use crate::http::handlers::bookings::{internal, CustomerQuery};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// Operator-authored session notes, shown on the customer's portal.
pub async fn publish_note(
    State(state): State<AppState>,
    Json(req): Json<PublishNoteRequest>,
) -> impl IntoResponse {
    let note = match req.into_note() {
        Ok(note) => note,
        Err(msg) => {
            return (StatusCode::BAD_REQUEST, Json(err("INVALID_NOTE", &msg))).into_response()
        }
    };

    match state.notes.publish(note).await {
        Ok(stored) => {
            tracing::info!(note_id = stored.id, user_email = %stored.user_email, "client note published");
            (StatusCode::CREATED, Json(serde_json::json!(stored))).into_response()
        }
        Err(e) => internal(e),
    }
}

pub async fn list_client_notes(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> impl IntoResponse {
    match state.notes.list_for(query.user_email.trim()).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!(items))).into_response(),
        Err(e) => internal(e),
    }
}
