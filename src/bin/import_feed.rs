// One-shot feed import CLI: run the pipeline once and print the summary.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use supply_catalog::catalog::db::Db;
use supply_catalog::catalog::store::{CatalogStore, PgCatalogStore};
use supply_catalog::ids::{IdSource, UuidIdSource};
use supply_catalog::importer::batch::DEFAULT_BATCH_SIZE;
use supply_catalog::importer::enhance::{
    DescriptionGenerator, DisabledGenerator, OpenAiGenerator, DEFAULT_ENHANCE_LIMIT,
};
use supply_catalog::importer::run::Importer;
use supply_catalog::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "import-feed", version, about = "Run one supplier feed import")]
struct Cli {
    /// Feed file path (defaults to FEED_PATH from the environment)
    #[arg(long)]
    feed: Option<PathBuf>,

    /// Products per bulk upsert
    #[arg(long)]
    batch_size: Option<usize>,

    /// Skip the description enhancement pass
    #[arg(long, default_value_t = false)]
    skip_enhance: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    supply_catalog::logging::init_tracing("info,sqlx=warn")?;
    env_util::init_env();
    let cli = Cli::parse();

    let feed_path = match cli.feed {
        Some(path) => path,
        None => PathBuf::from(
            env_util::env_opt("FEED_PATH").context("no --feed given and FEED_PATH not set")?,
        ),
    };

    let database_url = env_util::db_url()?;
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&database_url, max_connections).await?;

    let ids: Arc<dyn IdSource> = Arc::new(UuidIdSource);
    let store: Arc<dyn CatalogStore> = Arc::new(PgCatalogStore::new(db, ids.clone()));

    let (generator, enhance_limit): (Arc<dyn DescriptionGenerator>, i64) = if cli.skip_enhance {
        (Arc::new(DisabledGenerator), 0)
    } else {
        (
            Arc::new(OpenAiGenerator::from_env()?),
            env_util::env_parse("ENHANCE_LIMIT", DEFAULT_ENHANCE_LIMIT),
        )
    };

    let batch_size = cli
        .batch_size
        .unwrap_or_else(|| env_util::env_parse("IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE));

    let importer = Importer::new(store, generator, ids, batch_size, enhance_limit);
    let summary = importer.run(&feed_path).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
