use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::JobError;
use crate::catalog::{TleFetcher, TleLoader};
use crate::storage::{Storage, UpsertSummary};

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Skipped { last_fetched_at: DateTime<Utc> },
    Fetched(UpsertSummary),
}

fn is_due(last: Option<DateTime<Utc>>, now: DateTime<Utc>, min_interval: Duration) -> bool {
    match (last, chrono::Duration::from_std(min_interval)) {
        (Some(last), Ok(min_interval)) => now - last >= min_interval,
        _ => true,
    }
}

/// Pull fresh TLEs into the catalog unless the last fetch is recent enough.
pub async fn refresh_catalog(
    storage: &Storage,
    fetcher: &TleFetcher,
    min_interval: Duration,
    force: bool,
) -> Result<FetchOutcome, JobError> {
    let now = Utc::now();
    let last = storage.last_fetched_at()?;

    if !force && !is_due(last, now, min_interval) {
        if let Some(last_fetched_at) = last {
            log::info!(
                "Skipping TLE fetch, last fetch at {} is within {}",
                last_fetched_at,
                humantime::format_duration(min_interval)
            );
            return Ok(FetchOutcome::Skipped { last_fetched_at });
        }
    }

    let entries = fetcher.fetch_all().await?;
    let summary = storage.upsert_catalog(entries)?;
    storage.mark_fetched(now)?;

    log::info!(
        "Stored TLEs: {} new, {} updated",
        summary.inserted,
        summary.updated
    );
    Ok(FetchOutcome::Fetched(summary))
}

/// Merge the TLE files of a local folder into the catalog.
pub fn load_local_catalog(
    storage: &Storage,
    tle_folder: PathBuf,
) -> Result<UpsertSummary, JobError> {
    let entries = TleLoader::new(tle_folder).load_all()?;
    let summary = storage.upsert_catalog(entries)?;
    log::info!(
        "Loaded local TLEs: {} new, {} updated",
        summary.inserted,
        summary.updated
    );
    Ok(summary)
}
