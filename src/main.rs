// supply-catalog service: HTTP API + daily feed import schedule.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use supply_catalog::api::{ApiServer, AppState};
use supply_catalog::catalog::db::Db;
use supply_catalog::catalog::store::{CatalogStore, PgCatalogStore};
use supply_catalog::ids::{IdSource, UuidIdSource};
use supply_catalog::importer::batch::DEFAULT_BATCH_SIZE;
use supply_catalog::importer::enhance::{DescriptionGenerator, OpenAiGenerator, DEFAULT_ENHANCE_LIMIT};
use supply_catalog::importer::run::Importer;
use supply_catalog::importer::schedule;
use supply_catalog::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    supply_catalog::logging::init_tracing("info,sqlx=warn")?;
    env_util::init_env();
    env_util::preflight_check(
        "catalog-server",
        &["API_SECRET", "OPENAI_API_KEY"],
        &[
            "DATABASE_URL",
            "FEED_PATH",
            "API_HOST",
            "API_PORT",
            "IMPORT_SCHEDULE",
            "IMPORT_BATCH_SIZE",
            "ENHANCE_LIMIT",
        ],
    )?;

    let server = ApiServer::from_env()?;

    let database_url = env_util::db_url()?;
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&database_url, max_connections).await?;

    let ids: Arc<dyn IdSource> = Arc::new(UuidIdSource);
    let store: Arc<dyn CatalogStore> = Arc::new(PgCatalogStore::new(db.clone(), ids.clone()));
    let generator: Arc<dyn DescriptionGenerator> = Arc::new(OpenAiGenerator::from_env()?);

    let batch_size = env_util::env_parse("IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE);
    let enhance_limit = env_util::env_parse("ENHANCE_LIMIT", DEFAULT_ENHANCE_LIMIT);
    let importer = Arc::new(Importer::new(
        store.clone(),
        generator,
        ids,
        batch_size,
        enhance_limit,
    ));

    let feed_path = PathBuf::from(
        env_util::env_opt("FEED_PATH").unwrap_or_else(|| "data/products.txt".to_string()),
    );

    if env_util::env_flag("IMPORT_SCHEDULE", true) {
        schedule::spawn_daily(importer.clone(), feed_path.clone());
    } else {
        tracing::info!("daily import schedule disabled via IMPORT_SCHEDULE");
    }

    server
        .run(AppState {
            db,
            store,
            importer,
            feed_path,
        })
        .await
}
