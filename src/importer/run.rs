//! Import orchestration: decode -> transform -> accumulate -> flush -> enhance.
//!
//! Row-scoped failures are contained and logged; only a stream-open failure
//! or a store failure aborts a run. A run guard serializes overlapping
//! triggers (scheduled vs manual) instead of letting them race on
//! manufacturer creation and variant merge order.

use crate::catalog::model::Product;
use crate::catalog::store::{CatalogStore, StoreError};
use crate::ids::IdSource;
use crate::importer::batch::BatchAccumulator;
use crate::importer::enhance::{self, DescriptionGenerator};
use crate::importer::feed::{self, FeedRow};
use crate::importer::transform;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not open feed {path}: {source}")]
    Stream {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("an import run is already in progress")]
    AlreadyRunning,
    #[error("persistence failure during import: {0}")]
    Persistence(#[from] StoreError),
}

/// Per-run outcome returned to the trigger caller and logged by the
/// scheduler.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ImportSummary {
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub products_flushed: u64,
    pub flushes: u64,
    pub manufacturers_created: u64,
    pub enhanced: u64,
    pub enhancement_failures: u64,
    pub elapsed_ms: u64,
}

pub struct Importer {
    store: Arc<dyn CatalogStore>,
    generator: Arc<dyn DescriptionGenerator>,
    ids: Arc<dyn IdSource>,
    batch_size: usize,
    enhance_limit: i64,
    run_guard: Mutex<()>,
}

impl Importer {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        generator: Arc<dyn DescriptionGenerator>,
        ids: Arc<dyn IdSource>,
        batch_size: usize,
        enhance_limit: i64,
    ) -> Self {
        Self {
            store,
            generator,
            ids,
            batch_size,
            enhance_limit,
            run_guard: Mutex::new(()),
        }
    }

    /// Run one import over the feed at `feed_path`.
    ///
    /// Fails fast with [`ImportError::AlreadyRunning`] when another run holds
    /// the guard.
    pub async fn run(&self, feed_path: &Path) -> Result<ImportSummary, ImportError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| ImportError::AlreadyRunning)?;

        let started = Instant::now();
        info!(path = %feed_path.display(), "starting product feed import");

        let reader = feed::open_feed(feed_path).map_err(|source| ImportError::Stream {
            path: feed_path.to_path_buf(),
            source,
        })?;

        let mut summary = ImportSummary::default();
        let mut batch = BatchAccumulator::new(self.batch_size);

        // Rows are processed strictly in order: row N+1 is not transformed
        // before row N's transform (including its manufacturer write) has
        // completed, which keeps manufacturer dedup correct within the run.
        for (idx, record) in reader.into_deserialize::<FeedRow>().enumerate() {
            let row_index = idx + 1;
            let row = match record {
                Ok(row) => row,
                Err(err) => {
                    if err.is_io_error() {
                        // Stream-level failure ends the sequence; whatever is
                        // already accumulated still gets flushed.
                        error!(row = row_index, error = %err, "feed stream failed; ending read");
                        break;
                    }
                    summary.rows_read += 1;
                    summary.rows_skipped += 1;
                    warn!(row = row_index, error = %err, "skipping malformed feed row");
                    continue;
                }
            };
            summary.rows_read += 1;

            match transform::transform_row(self.store.as_ref(), self.ids.as_ref(), &row).await {
                Ok(outcome) => {
                    if outcome.manufacturer_created {
                        summary.manufacturers_created += 1;
                    }
                    if let Some(full) = batch.push(outcome.product) {
                        self.flush(&full, &mut summary).await?;
                    }
                }
                Err(err) => {
                    summary.rows_skipped += 1;
                    warn!(row = row_index, content = ?row, error = %err, "skipping feed row");
                }
            }
        }

        let rest = batch.drain();
        self.flush(&rest, &mut summary).await?;

        let outcome = enhance::enhance_recent(
            self.store.as_ref(),
            self.generator.as_ref(),
            self.enhance_limit,
        )
        .await?;
        summary.enhanced = outcome.enhanced;
        summary.enhancement_failures = outcome.failed;
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            rows = summary.rows_read,
            skipped = summary.rows_skipped,
            flushed = summary.products_flushed,
            flushes = summary.flushes,
            enhanced = summary.enhanced,
            elapsed_ms = summary.elapsed_ms,
            "product feed import complete"
        );
        Ok(summary)
    }

    async fn flush(
        &self,
        products: &[Product],
        summary: &mut ImportSummary,
    ) -> Result<(), StoreError> {
        if products.is_empty() {
            return Ok(());
        }
        self.store.upsert_products(products).await?;
        summary.flushes += 1;
        summary.products_flushed += products.len() as u64;
        info!(
            batch = products.len(),
            flush = summary.flushes,
            "flushed product batch"
        );
        Ok(())
    }
}
