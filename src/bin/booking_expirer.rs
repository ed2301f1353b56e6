use anyhow::Result;
use celestia_bookings::config::AppConfig;
use celestia_bookings::repo::bookings_repo::BookingsRepo;
use celestia_bookings::service::expiry_sweep::expire_pending;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&cfg.database_url)
        .await?;

    let repo = BookingsRepo { pool };
    tracing::info!(expiry_hours = cfg.booking_expiry_hours, "booking expirer started");

    loop {
        let cutoff = chrono::Utc::now() - chrono::Duration::hours(cfg.booking_expiry_hours);
        match expire_pending(&repo, cutoff, 200).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(expired = n, "expiry sweep finished"),
            Err(e) => tracing::error!("expiry sweep failed: {}", e),
        }

        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
    }
}
