use anyhow::Result;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        // Ensure TLS is enabled when DSN contains sslmode=require
        // sqlx with runtime-tokio-rustls should handle this automatically via the DSN,
        // but we can be explicit to avoid issues
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");

        // Optional schema bootstrap gate (default: OFF).
        // We default to off because this service may run against an already
        // provisioned schema. Enable explicitly with AUTO_MIGRATE=1/true/on.
        let auto_migrate = std::env::var("AUTO_MIGRATE")
            .map(|raw| {
                let v = raw.trim().to_ascii_lowercase();
                matches!(v.as_str(), "1" | "true" | "on" | "yes")
            })
            .unwrap_or(false);
        if auto_migrate {
            info!("ensuring catalog schema (AUTO_MIGRATE=on)");
            Self::ensure_schema(&pool).await?;
        } else {
            info!("AUTO_MIGRATE disabled; skipping schema bootstrap");
        }
        Ok(Self { pool })
    }

    /// Create the catalog tables when they do not exist yet. Idempotent.
    pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS manufacturers (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
             )",
        )
        .execute(pool)
        .await?;

        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS products (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                product_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                short_description TEXT NOT NULL DEFAULT '',
                vendor_id TEXT NOT NULL,
                manufacturer_id BIGINT NOT NULL REFERENCES manufacturers(id),
                variants JSONB NOT NULL DEFAULT '[]'::jsonb,
                storefront_price_visibility TEXT NOT NULL DEFAULT 'Visible',
                availability TEXT NOT NULL DEFAULT '',
                images JSONB NOT NULL DEFAULT '[]'::jsonb,
                category JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
             )",
        )
        .execute(pool)
        .await?;

        // Serves the recent-products query of the enhancement pass.
        sqlx::raw_sql(
            "CREATE INDEX IF NOT EXISTS products_created_at_idx
                ON products (created_at DESC, id DESC)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}
