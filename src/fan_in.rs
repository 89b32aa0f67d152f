//! # Concurrent Fan-In
//!
//! Parses many worker logs at once with a bounded number of files in flight.
//!
//! Each file is handled by its own task in a [`JoinSet`]. A [`Semaphore`]
//! caps how many of them read at the same time, and the file I/O itself runs on
//! the blocking thread pool so the async workers stay free.
//!
//! ## Failure Handling
//!
//! The batch is all or nothing. When a parse fails, the semaphore is closed so
//! tasks still waiting for a slot give up without touching their file, and the
//! tasks already reading are allowed to finish. Every task is joined before
//! returning, then the first error is reported and all parsed stores dropped.

use crate::parser::parse_results_file;
use crate::samples::SampleStore;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Parse every file in `paths`, at most `concurrency` at a time.
///
/// Stores are returned in completion order. A `concurrency` of zero is
/// treated as one.
pub async fn parse_all(paths: Vec<PathBuf>, concurrency: usize) -> Result<Vec<SampleStore>> {
    let slots = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for path in paths {
        let slots = Arc::clone(&slots);
        tasks.spawn(async move {
            let _permit = slots
                .acquire_owned()
                .await
                .map_err(|_| anyhow!("skipped {} after an earlier failure", path.display()))?;

            let label = path.display().to_string();
            let store = tokio::task::spawn_blocking(move || parse_results_file(&path))
                .await
                .with_context(|| format!("parse task for {} did not complete", label))??;
            Ok::<_, anyhow::Error>(store)
        });
    }

    let mut stores = Vec::with_capacity(tasks.len());
    let mut first_error: Option<anyhow::Error> = None;

    while let Some(joined) = tasks.join_next().await {
        let outcome = joined
            .context("parse task did not complete")
            .and_then(|result| result);

        match outcome {
            Ok(store) if first_error.is_none() => stores.push(store),
            Ok(_) => {}
            Err(err) if first_error.is_none() => {
                slots.close();
                first_error = Some(err);
            }
            Err(err) => debug!("Discarding follow-up failure: {:#}", err),
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(stores),
    }
}
