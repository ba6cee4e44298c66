mod cdm;
mod error;
mod fanout;
mod scanner;
mod types;

pub use cdm::{evaluate_cdms, Cdm, CdmAlert, CdmAlertPolicy, RiskLevel};
pub use error::ScanError;
pub use fanout::{scan_catalog_concurrent, FanOut, DEFAULT_MAX_CONCURRENCY};
pub use scanner::{compare_series, detect_close_approaches, scan_catalog};
pub use types::{
    format_utc_z, CloseApproachEvent, ObjectIdentity, ScanFailure, ScanOptions, ScanReport,
    ThresholdMode,
};

#[cfg(test)]
pub(crate) use cdm::tests as tests_support;
