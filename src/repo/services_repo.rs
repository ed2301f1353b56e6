use crate::domain::service::Service;
use crate::repo::booking_store::ServiceCatalog;
use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct ServicesRepo {
    pub pool: PgPool,
}

fn service_from_row(r: &PgRow) -> Service {
    Service {
        key: r.get("key"),
        name: r.get("name"),
        description: r.get("description"),
        price_minor: r.get("price_minor"),
        duration_mins: r.get("duration_mins"),
        active: r.get("active"),
    }
}

#[async_trait::async_trait]
impl ServiceCatalog for ServicesRepo {
    async fn list_active(&self) -> Result<Vec<Service>> {
        let rows = sqlx::query(
            "SELECT key, name, description, price_minor, duration_mins, active FROM services WHERE active = true ORDER BY price_minor ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(service_from_row).collect())
    }

    async fn find_active(&self, key: &str) -> Result<Option<Service>> {
        let row = sqlx::query(
            "SELECT key, name, description, price_minor, duration_mins, active FROM services WHERE key = $1 AND active = true",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(service_from_row))
    }

    async fn upsert(&self, s: &Service) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO services (key, name, description, price_minor, duration_mins, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (key) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price_minor = EXCLUDED.price_minor,
                duration_mins = EXCLUDED.duration_mins,
                active = EXCLUDED.active,
                updated_at = now()
            "#,
        )
        .bind(&s.key)
        .bind(&s.name)
        .bind(&s.description)
        .bind(s.price_minor)
        .bind(s.duration_mins)
        .bind(s.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_if_absent(&self, s: &Service) -> Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO services (key, name, description, price_minor, duration_mins, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(&s.key)
        .bind(&s.name)
        .bind(&s.description)
        .bind(s.price_minor)
        .bind(s.duration_mins)
        .bind(s.active)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }
}
