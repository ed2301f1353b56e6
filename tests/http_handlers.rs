mod common;

use axum::body::{to_bytes, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use celestia_bookings::domain::checkout::CreateCheckoutRequest;
use celestia_bookings::http::handlers::checkout::create_checkout;
use celestia_bookings::http::handlers::webhooks::{payment_webhook, SIGNATURE_HEADER};
use common::{app_state as state, completed_event, harness, sign};

async fn json_body(resp: Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn signed_headers(payload: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        SIGNATURE_HEADER,
        HeaderValue::from_str(&sign(payload)).unwrap(),
    );
    headers
}

#[tokio::test]
async fn webhook_acknowledges_applied_event() {
    let h = harness();
    let state = state(&h);
    let resp = create_checkout(
        State(state.clone()),
        Json(CreateCheckoutRequest {
            service_key: "personal-tarot".to_string(),
            user_email: "alice@example.com".to_string(),
            success_url: None,
            cancel_url: None,
        }),
    )
    .await
    .into_response();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["checkout_session_id"], "cs_test_1");

    let payload = completed_event("evt_1", "cs_test_1", 8500, "alice@example.com");
    let resp = payment_webhook(
        State(state.clone()),
        signed_headers(&payload),
        Bytes::from(payload.clone()),
    )
    .await
    .into_response();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["received"], true);
    assert_eq!(body["outcome"], "applied");

    let resp = payment_webhook(State(state), signed_headers(&payload), Bytes::from(payload))
        .await
        .into_response();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["outcome"], "already_applied");
}

#[tokio::test]
async fn webhook_without_valid_signature_is_400() {
    let h = harness();
    let payload = completed_event("evt_1", "cs_test_1", 8500, "alice@example.com");

    let resp = payment_webhook(
        State(state(&h)),
        HeaderMap::new(),
        Bytes::from(payload.clone()),
    )
    .await
    .into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut headers = HeaderMap::new();
    headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("t=1,v1=deadbeef"));
    let resp = payment_webhook(State(state(&h)), headers, Bytes::from(payload))
        .await
        .into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["code"], "SIGNATURE_INVALID");
}

#[tokio::test]
async fn checkout_for_unknown_service_is_404() {
    let h = harness();
    let resp = create_checkout(
        State(state(&h)),
        Json(CreateCheckoutRequest {
            service_key: "crystal-ball".to_string(),
            user_email: "alice@example.com".to_string(),
            success_url: None,
            cancel_url: None,
        }),
    )
    .await
    .into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"]["code"], "SERVICE_NOT_FOUND");
}
