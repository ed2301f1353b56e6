use anyhow::Result;
use celestia_bookings::config::AppConfig;
use celestia_bookings::domain::service::default_catalog;
use celestia_bookings::repo::booking_store::ServiceCatalog;
use celestia_bookings::repo::services_repo::ServicesRepo;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let repo = ServicesRepo { pool: pool.clone() };
    for service in default_catalog() {
        if repo.insert_if_absent(&service).await? {
            tracing::info!(
                key = %service.key,
                price_minor = service.price_minor,
                duration_mins = service.duration_mins,
                "service seeded"
            );
        } else {
            tracing::info!(key = %service.key, "service already present");
        }
    }

    pool.close().await;
    Ok(())
}
