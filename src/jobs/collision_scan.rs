use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::JobError;
use crate::catalog::partition;
use crate::conjunction::scan_catalog_concurrent;
use crate::propagation::PropagationOracle;
use crate::storage::Storage;
use crate::web::config::ScanConfig;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanSummary {
    pub scan_id: String,
    pub events_found: usize,
    pub inserted: usize,
    pub failures: usize,
    pub complete: bool,
}

/// Runs catalog-wide collision scans, at most one at a time.
#[derive(Clone)]
pub struct ScanTrigger {
    running: Arc<AtomicBool>,
    storage: Arc<Storage>,
    oracle: Arc<dyn PropagationOracle>,
    config: ScanConfig,
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ScanTrigger {
    pub fn new(
        storage: Arc<Storage>,
        oracle: Arc<dyn PropagationOracle>,
        config: ScanConfig,
    ) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            storage,
            oracle,
            config,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn claim(&self) -> Result<RunningGuard, JobError> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| RunningGuard(self.running.clone()))
            .map_err(|_| JobError::AlreadyRunning)
    }

    /// Run a scan to completion on the current task.
    pub async fn run(&self) -> Result<ScanSummary, JobError> {
        let guard = self.claim()?;
        let result = self.scan().await;
        drop(guard);
        result
    }

    /// Start a scan in the background. Fails immediately if one is running.
    pub fn spawn(&self) -> Result<(), JobError> {
        let guard = self.claim()?;
        let trigger = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            match trigger.scan().await {
                Ok(summary) => log::info!(
                    "Collision scan {} complete: {} close approaches stored",
                    summary.scan_id,
                    summary.inserted
                ),
                Err(e) => log::error!("Collision scan failed: {}", e),
            }
        });
        Ok(())
    }

    async fn scan(&self) -> Result<ScanSummary, JobError> {
        let catalog = self.storage.catalog()?;
        let (tracked, hazards) = partition(&catalog);

        let report = scan_catalog_concurrent(
            self.oracle.clone(),
            tracked,
            hazards,
            self.config.options,
            self.config.fan_out(),
            None,
        )
        .await?;

        for failure in &report.failures {
            log::warn!(
                "Scan {}: {} skipped: {}",
                report.scan_id,
                failure.object,
                failure.reason
            );
        }

        // A scan cut short by its deadline only adds to the stored set.
        let inserted = if report.complete {
            self.storage.replace_approaches(&report.events)?
        } else {
            log::warn!(
                "Scan {} incomplete, keeping previous close approaches and merging {} new events",
                report.scan_id,
                report.events.len()
            );
            self.storage.insert_approaches(&report.events)?
        };

        Ok(ScanSummary {
            scan_id: report.scan_id,
            events_found: report.events.len(),
            inserted,
            failures: report.failures.len(),
            complete: report.complete,
        })
    }
}
