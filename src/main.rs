use celestia_bookings::config::AppConfig;
use celestia_bookings::gateways::stripe::StripeGateway;
use celestia_bookings::http::routes::{build_router, RouteConfig};
use celestia_bookings::repo::bookings_repo::BookingsRepo;
use celestia_bookings::repo::notes_repo::NotesRepo;
use celestia_bookings::repo::services_repo::ServicesRepo;
use celestia_bookings::service::checkout_coordinator::{CheckoutCoordinator, CheckoutSettings};
use celestia_bookings::service::notification_dispatcher::{
    DispatchStats, MailRelayNotifier, NotificationQueue, NotificationRelay, NotificationWorker,
};
use celestia_bookings::service::signature::WebhookVerifier;
use celestia_bookings::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    if cfg.stripe_webhook_secret.is_empty() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET is empty, every webhook will be rejected");
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_millis(cfg.store_timeout_ms))
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;
    let http_client = reqwest::Client::new();

    let bookings = Arc::new(BookingsRepo { pool: pool.clone() });
    let catalog = Arc::new(ServicesRepo { pool: pool.clone() });
    let notes = Arc::new(NotesRepo { pool: pool.clone() });

    let notifier = Arc::new(MailRelayNotifier {
        relay_url: cfg.mail_relay_url.clone(),
        from: cfg.mail_from.clone(),
        client: http_client.clone(),
    });
    let stats = Arc::new(DispatchStats::default());

    let (alerts, receiver) = NotificationQueue::channel_with_stats(1024, stats.clone());
    let worker = tokio::spawn(
        NotificationWorker {
            receiver,
            notifier: notifier.clone(),
            stats: stats.clone(),
        }
        .run(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = tokio::spawn(
        NotificationRelay {
            store: bookings.clone(),
            notifier,
            stats: stats.clone(),
            batch_size: 100,
            poll_interval: Duration::from_millis(cfg.notification_poll_ms),
        }
        .run(shutdown_rx),
    );

    let gateway = Arc::new(StripeGateway {
        base_url: cfg.stripe_api_base.clone(),
        secret_key: cfg.stripe_secret_key.clone(),
        timeout_ms: cfg.gateway_timeout_ms,
        client: http_client,
    });

    let coordinator = CheckoutCoordinator {
        catalog: catalog.clone(),
        store: bookings.clone(),
        gateway,
        verifier: WebhookVerifier::new(&cfg.stripe_webhook_secret, cfg.webhook_tolerance_secs),
        alerts: alerts.clone(),
        settings: CheckoutSettings {
            currency: cfg.checkout_currency.clone(),
            public_base_url: cfg.public_base_url.clone(),
            operator_email: cfg.operator_email.clone(),
            store_timeout: Duration::from_millis(cfg.store_timeout_ms),
        },
    };

    let state = AppState {
        coordinator,
        store: bookings,
        catalog,
        notes,
        pool: pool.clone(),
        redis_client,
        notification_stats: stats,
    };

    let app = build_router(
        state,
        RouteConfig {
            internal_api_key: cfg.internal_api_key.clone(),
            checkout_rate_limit_per_minute: cfg.checkout_rate_limit_per_minute,
        },
    );

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // last alert sender; the worker exits once the queue is empty
    drop(alerts);
    let _ = shutdown_tx.send(true);

    let drain = Duration::from_secs(cfg.shutdown_drain_secs);
    if tokio::time::timeout(drain, worker).await.is_err() {
        tracing::warn!("alert queue not drained within {:?}", drain);
    }
    if tokio::time::timeout(drain, relay).await.is_err() {
        tracing::warn!("notification relay did not stop within {:?}, unsent rows stay queued", drain);
    }

    pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
