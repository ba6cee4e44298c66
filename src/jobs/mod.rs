mod cdm_scan;
mod collision_scan;
mod refresh;
mod worker;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::conjunction::ScanError;
use crate::storage::StorageError;

pub use cdm_scan::scan_cdm_for_alerts;
pub use collision_scan::{ScanSummary, ScanTrigger};
pub use refresh::{load_local_catalog, refresh_catalog, FetchOutcome};
pub use worker::{JobContext, JobRunner};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("collision scan already running")]
    AlreadyRunning,
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
}
