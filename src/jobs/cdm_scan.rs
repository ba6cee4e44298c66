use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::JobError;
use crate::conjunction::{evaluate_cdms, CdmAlertPolicy};
use crate::storage::Storage;

/// Raise alerts for recent risky CDMs that have none yet. Returns the number
/// of new alerts.
pub fn scan_cdm_for_alerts(
    storage: &Storage,
    policy: &CdmAlertPolicy,
    now: DateTime<Utc>,
) -> Result<usize, JobError> {
    let cdms = storage.cdms()?;
    let alerted: HashSet<String> = storage
        .cdm_alerts()?
        .into_iter()
        .map(|a| a.cdm_id)
        .collect();

    let alerts = evaluate_cdms(&cdms, policy, &alerted, now);
    let inserted = storage.insert_cdm_alerts(alerts)?;
    log::info!("CDM scan: {} CDMs checked, {} new alerts", cdms.len(), inserted);
    Ok(inserted)
}
