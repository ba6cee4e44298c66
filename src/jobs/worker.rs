use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};

use super::{refresh_catalog, scan_cdm_for_alerts, JobError, ScanTrigger};
use crate::catalog::TleFetcher;
use crate::conjunction::CdmAlertPolicy;
use crate::storage::Storage;
use crate::web::config::{FetchConfig, JobsConfig};

pub struct JobContext {
    pub storage: Arc<Storage>,
    pub fetch: FetchConfig,
    pub jobs: JobsConfig,
    pub cdm_policy: CdmAlertPolicy,
    pub trigger: ScanTrigger,
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Background loop for the periodic jobs: TLE refresh (also at startup),
/// CDM alert scan and the optional periodic collision scan.
pub struct JobRunner {
    worker: Option<WorkerHandle>,
}

impl JobRunner {
    pub fn start(context: JobContext) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_jobs(context, stop_rx));
        Self {
            worker: Some(WorkerHandle { stop_tx, join }),
        }
    }

    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
    }
}

fn delayed_interval(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn tick_optional(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn run_jobs(context: JobContext, mut stop_rx: oneshot::Receiver<()>) {
    let fetcher = context.fetch.enabled.then(|| {
        TleFetcher::new(context.fetch.active.clone(), context.fetch.debris_sources.clone())
    });

    let mut tle_ticker = interval(context.jobs.tle_fetch_every);
    tle_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cdm_ticker = delayed_interval(context.jobs.cdm_scan_every);
    let mut scan_ticker = context.jobs.collision_scan_every.map(delayed_interval);

    log::info!(
        "Jobs started: TLE refresh every {}, CDM scan every {}",
        humantime::format_duration(context.jobs.tle_fetch_every),
        humantime::format_duration(context.jobs.cdm_scan_every)
    );

    loop {
        tokio::select! {
            _ = tle_ticker.tick() => {
                if let Some(fetcher) = &fetcher {
                    if let Err(e) = refresh_catalog(
                        &context.storage,
                        fetcher,
                        context.fetch.min_refresh_interval,
                        false,
                    )
                    .await
                    {
                        log::error!("TLE refresh failed: {}", e);
                    }
                }
            }
            _ = cdm_ticker.tick() => {
                let policy = &context.cdm_policy;
                if let Err(e) = scan_cdm_for_alerts(&context.storage, policy, Utc::now()) {
                    log::error!("CDM scan failed: {}", e);
                }
            }
            _ = tick_optional(&mut scan_ticker) => {
                match context.trigger.spawn() {
                    Ok(()) => log::info!("Periodic collision scan started"),
                    Err(JobError::AlreadyRunning) => {
                        log::info!("Periodic collision scan skipped, one is already running")
                    }
                    Err(e) => log::error!("Periodic collision scan failed to start: {}", e),
                }
            }
            _ = &mut stop_rx => break,
        }
    }

    log::info!("Jobs stopped");
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::catalog::{CatalogEntry, ObjectType, OrbitalElement};
    use crate::propagation::testing::{circular_element, CircularOrbitOracle};
    use crate::propagation::{PropagationError, PropagationOracle};
    use crate::storage::tests::temp_storage;
    use crate::web::config::ScanConfig;

    /// Circular orbits that block for the given time on every call.
    struct SlowOracle(Duration);

    impl PropagationOracle for SlowOracle {
        fn propagate(
            &self,
            element: &OrbitalElement,
            timestamps: &[DateTime<Utc>],
        ) -> Result<Vec<[f64; 3]>, PropagationError> {
            std::thread::sleep(self.0);
            CircularOrbitOracle.propagate(element, timestamps)
        }
    }

    fn entry(element: OrbitalElement, object_type: ObjectType) -> CatalogEntry {
        CatalogEntry {
            norad_id: element.norad_id().unwrap_or_default(),
            element,
            object_type,
            source: "test".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn context(storage: Arc<Storage>, trigger: ScanTrigger, jobs: JobsConfig) -> JobContext {
        JobContext {
            storage,
            fetch: FetchConfig {
                enabled: false,
                ..FetchConfig::default()
            },
            jobs,
            cdm_policy: CdmAlertPolicy::default(),
            trigger,
        }
    }

    #[tokio::test]
    async fn runner_stops_on_request() {
        let storage = Arc::new(temp_storage());
        let trigger = ScanTrigger::new(
            storage.clone(),
            Arc::new(CircularOrbitOracle),
            ScanConfig::default(),
        );
        let mut runner = JobRunner::start(context(storage, trigger, JobsConfig::default()));

        tokio::time::timeout(Duration::from_secs(5), runner.stop())
            .await
            .unwrap();
        assert!(runner.worker.is_none());
    }

    #[tokio::test]
    async fn stop_does_not_wait_for_a_running_scan() {
        let storage = Arc::new(temp_storage());
        storage
            .upsert_catalog(vec![
                entry(
                    circular_element("SAT-A", 40001, 53.0, 10.0, 0.0, 15.2),
                    ObjectType::Payload,
                ),
                entry(
                    circular_element("DEB-B", 50001, 70.0, 90.0, 30.0, 14.5),
                    ObjectType::Debris,
                ),
            ])
            .unwrap();
        let trigger = ScanTrigger::new(
            storage.clone(),
            Arc::new(SlowOracle(Duration::from_millis(800))),
            ScanConfig::default(),
        );
        let jobs = JobsConfig {
            collision_scan_every: Some(Duration::from_millis(20)),
            ..JobsConfig::default()
        };
        let mut runner = JobRunner::start(context(storage.clone(), trigger.clone(), jobs));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(trigger.is_running());

        tokio::time::timeout(Duration::from_millis(300), runner.stop())
            .await
            .unwrap();

        std::fs::remove_dir_all(storage.base()).unwrap();
    }
}
