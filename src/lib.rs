pub mod config;
pub mod domain {
    pub mod booking;
    pub mod checkout;
    pub mod note;
    pub mod notification;
    pub mod service;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod bookings;
        pub mod checkout;
        pub mod notes;
        pub mod ops;
        pub mod services;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod admin_auth;
        pub mod rate_limit;
    }
    pub mod routes;
}
pub mod repo {
    pub mod booking_store;
    pub mod bookings_repo;
    pub mod memory_store;
    pub mod notes_repo;
    pub mod services_repo;
}
pub mod service {
    pub mod checkout_coordinator;
    pub mod expiry_sweep;
    pub mod notification_dispatcher;
    pub mod signature;
}

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: service::checkout_coordinator::CheckoutCoordinator,
    pub store: Arc<dyn repo::booking_store::BookingStore>,
    pub catalog: Arc<dyn repo::booking_store::ServiceCatalog>,
    pub notes: Arc<dyn repo::booking_store::NoteBook>,
    pub pool: sqlx::PgPool,
    pub redis_client: redis::Client,
    pub notification_stats: Arc<service::notification_dispatcher::DispatchStats>,
}
