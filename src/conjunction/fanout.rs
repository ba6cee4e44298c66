use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};

use super::error::ScanError;
use super::scanner::{compare_series, isolate, record_pair};
use super::types::{CloseApproachEvent, ScanOptions, ScanReport};
use crate::catalog::OrbitalElement;
use crate::propagation::{sample, PositionSample, PropagationError, PropagationOracle, SampleGrid};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Bounds for the concurrent scan.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    pub max_concurrency: usize,
    /// Stop spawning work after this long and return what finished.
    pub timeout: Option<StdDuration>,
}

impl Default for FanOut {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: None,
        }
    }
}

type Series = Arc<Vec<PositionSample>>;
type PairOutcome = (Series, Series, Result<Vec<CloseApproachEvent>, ScanError>);

enum Joined<T> {
    Item(T),
    Drained,
    Expired,
}

/// Concurrent version of [`super::scan_catalog`].
///
/// Objects are propagated one task each, then every (tracked, hazard) pair is
/// compared in its own task, with at most `max_concurrency` tasks in flight.
/// Results are concatenated in completion order. Hitting the timeout is not an
/// error: the report comes back with `complete == false`.
pub async fn scan_catalog_concurrent(
    oracle: Arc<dyn PropagationOracle>,
    tracked: Vec<OrbitalElement>,
    hazards: Vec<OrbitalElement>,
    options: ScanOptions,
    fan_out: FanOut,
    start_time: Option<DateTime<Utc>>,
) -> Result<ScanReport, ScanError> {
    let deadline = fan_out.timeout.map(|t| Instant::now() + t);
    let grid = options.grid(start_time.unwrap_or_else(Utc::now))?;
    let semaphore = Arc::new(Semaphore::new(fan_out.max_concurrency.max(1)));
    let mut report = ScanReport::new(&grid);

    log::info!(
        "Scan {}: {} tracked x {} hazards, up to {} workers",
        report.scan_id,
        tracked.len(),
        hazards.len(),
        fan_out.max_concurrency.max(1)
    );

    let tracked_series =
        sample_all(&oracle, tracked, grid, &semaphore, deadline, &mut report).await?;
    let hazard_series =
        sample_all(&oracle, hazards, grid, &semaphore, deadline, &mut report).await?;

    if report.complete {
        compare_all(&tracked_series, &hazard_series, options, &semaphore, deadline, &mut report)
            .await?;
    }

    if !report.complete {
        log::warn!(
            "Scan {} hit its deadline after {} pairs",
            report.scan_id,
            report.pairs_scanned
        );
    }
    log::info!(
        "Scan {} finished: {} pairs, {} events, {} failures",
        report.scan_id,
        report.pairs_scanned,
        report.events.len(),
        report.failures.len()
    );
    Ok(report)
}

async fn sample_all(
    oracle: &Arc<dyn PropagationOracle>,
    elements: Vec<OrbitalElement>,
    grid: SampleGrid,
    semaphore: &Arc<Semaphore>,
    deadline: Option<Instant>,
    report: &mut ScanReport,
) -> Result<Vec<Series>, ScanError> {
    if !report.complete {
        return Ok(Vec::new());
    }

    let count = elements.len();
    let mut tasks: JoinSet<(usize, OrbitalElement, Result<Vec<PositionSample>, PropagationError>)> =
        JoinSet::new();

    for (index, element) in elements.into_iter().enumerate() {
        let Some(permit) = acquire_before(semaphore, deadline).await else {
            report.complete = false;
            break;
        };
        let oracle = oracle.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let result = sample(oracle.as_ref(), &element, &grid);
            (index, element, result)
        });
    }

    let mut slots: Vec<Option<Series>> = vec![None; count];
    loop {
        match join_next_before(&mut tasks, deadline).await? {
            Joined::Item((index, element, result)) => {
                match isolate(&element, result, report) {
                    Ok(Some(samples)) => slots[index] = Some(Arc::new(samples)),
                    Ok(None) => {}
                    Err(e) => {
                        tasks.abort_all();
                        return Err(e);
                    }
                }
            }
            Joined::Drained => break,
            Joined::Expired => {
                tasks.abort_all();
                report.complete = false;
                break;
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

async fn compare_all(
    tracked: &[Series],
    hazards: &[Series],
    options: ScanOptions,
    semaphore: &Arc<Semaphore>,
    deadline: Option<Instant>,
    report: &mut ScanReport,
) -> Result<(), ScanError> {
    let mut tasks: JoinSet<PairOutcome> = JoinSet::new();

    'spawn: for series_a in tracked {
        for series_b in hazards {
            let Some(permit) = acquire_before(semaphore, deadline).await else {
                report.complete = false;
                break 'spawn;
            };
            let (a, b) = (series_a.clone(), series_b.clone());
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = compare_series(&a, &b, &options);
                (a, b, result)
            });
        }
    }

    loop {
        match join_next_before(&mut tasks, deadline).await? {
            Joined::Item((a, b, result)) => record_pair(report, &a, &b, result),
            Joined::Drained => break,
            Joined::Expired => {
                tasks.abort_all();
                report.complete = false;
                break;
            }
        }
    }
    Ok(())
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

async fn acquire_before(
    semaphore: &Arc<Semaphore>,
    deadline: Option<Instant>,
) -> Option<OwnedSemaphorePermit> {
    if expired(deadline) {
        return None;
    }
    let acquire = semaphore.clone().acquire_owned();
    match deadline {
        Some(deadline) => tokio::select! {
            permit = acquire => permit.ok(),
            _ = sleep_until(deadline) => None,
        },
        None => acquire.await.ok(),
    }
}

async fn join_next_before<T: 'static>(
    tasks: &mut JoinSet<T>,
    deadline: Option<Instant>,
) -> Result<Joined<T>, ScanError> {
    if tasks.is_empty() {
        return Ok(Joined::Drained);
    }
    if expired(deadline) {
        return Ok(Joined::Expired);
    }

    let next = match deadline {
        Some(deadline) => tokio::select! {
            next = tasks.join_next() => next,
            _ = sleep_until(deadline) => return Ok(Joined::Expired),
        },
        None => tasks.join_next().await,
    };

    match next {
        Some(Ok(item)) => Ok(Joined::Item(item)),
        Some(Err(e)) => Err(ScanError::Worker(e.to_string())),
        None => Ok(Joined::Drained),
    }
}
