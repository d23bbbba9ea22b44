//! Daily import schedule.
//!
//! One spawned task sleeps until the next UTC midnight, fires a run, and
//! reschedules. Overlap with a manual trigger is absorbed by the importer's
//! run guard, so a skipped firing is logged rather than raced.

use crate::importer::run::{ImportError, Importer};
use chrono::{DateTime, NaiveTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Time until the next UTC midnight after `now`.
pub fn until_next_midnight(now: DateTime<Utc>) -> Duration {
    let next = (now.date_naive() + chrono::Days::new(1))
        .and_time(NaiveTime::MIN)
        .and_utc();
    (next - now).to_std().unwrap_or_default()
}

pub fn spawn_daily(importer: Arc<Importer>, feed_path: PathBuf) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = until_next_midnight(Utc::now());
            info!(
                seconds = wait.as_secs(),
                path = %feed_path.display(),
                "next scheduled import"
            );
            tokio::time::sleep(wait).await;

            match importer.run(&feed_path).await {
                Ok(summary) => info!(
                    rows = summary.rows_read,
                    skipped = summary.rows_skipped,
                    flushed = summary.products_flushed,
                    "scheduled import finished"
                ),
                Err(ImportError::AlreadyRunning) => {
                    warn!("scheduled import skipped; a run is already in progress")
                }
                Err(err) => error!(error = %err, "scheduled import failed"),
            }
        }
    })
}
