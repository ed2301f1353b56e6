use crate::http::handlers::{bookings, checkout, notes, ops, services, webhooks};
use crate::http::middleware::{admin_auth, rate_limit};
use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;

pub struct RouteConfig {
    pub internal_api_key: String,
    pub checkout_rate_limit_per_minute: i64,
}

pub fn build_router(state: AppState, cfg: RouteConfig) -> Router {
    let admin_routes = Router::new()
        .route("/admin/stats", get(bookings::stats))
        .route("/admin/bookings", get(bookings::admin_list_bookings))
        .route("/admin/anomalies", get(bookings::list_anomalies))
        .route("/admin/anomalies/:id/resolve", post(bookings::resolve_anomaly))
        .route("/admin/services/:key", put(services::upsert_service))
        .route("/admin/notes", post(notes::publish_note))
        .layer(from_fn_with_state(
            cfg.internal_api_key,
            admin_auth::require_internal_api_key,
        ));

    let checkout_routes = Router::new()
        .route("/checkout/sessions", post(checkout::create_checkout))
        .layer(from_fn_with_state(
            rate_limit::RateLimitState {
                redis_client: state.redis_client.clone(),
                scope: "checkout",
                max_per_minute: cfg.checkout_rate_limit_per_minute,
            },
            rate_limit::enforce,
        ));

    Router::new()
        .route("/health", get(ops::health))
        .route("/ops/liveness", get(ops::liveness))
        .route("/ops/readiness", get(ops::readiness))
        .route("/services", get(services::list_services))
        .route(
            "/checkout/sessions/:checkout_session_id",
            get(checkout::get_checkout_session),
        )
        .route("/bookings", get(bookings::list_customer_bookings))
        .route("/notes", get(notes::list_client_notes))
        .route("/webhooks/payments", post(webhooks::payment_webhook))
        .merge(checkout_routes)
        .merge(admin_routes)
        .with_state(state)
}
