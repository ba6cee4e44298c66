use chrono::{DateTime, Utc};

use super::error::ScanError;
use super::types::{CloseApproachEvent, ObjectIdentity, ScanFailure, ScanOptions, ScanReport};
use crate::catalog::OrbitalElement;
use crate::propagation::{sample, PositionSample, PropagationError, PropagationOracle, SampleGrid};

/// Sample two objects on one shared grid and compare them index by index.
///
/// `start_time` defaults to the current instant, captured once for both objects.
pub fn detect_close_approaches(
    oracle: &dyn PropagationOracle,
    object_a: &OrbitalElement,
    object_b: &OrbitalElement,
    options: &ScanOptions,
    start_time: Option<DateTime<Utc>>,
) -> Result<Vec<CloseApproachEvent>, ScanError> {
    let grid = options.grid(start_time.unwrap_or_else(Utc::now))?;
    let series_a = sample(oracle, object_a, &grid)?;
    let series_b = sample(oracle, object_b, &grid)?;
    compare_series(&series_a, &series_b, options)
}

/// Pairwise distances of two aligned position series.
///
/// Both series must share the same timestamp grid; anything else is an
/// [`ScanError::Alignment`] and nothing is emitted for the pair.
pub fn compare_series(
    series_a: &[PositionSample],
    series_b: &[PositionSample],
    options: &ScanOptions,
) -> Result<Vec<CloseApproachEvent>, ScanError> {
    let misaligned = series_a.len() != series_b.len()
        || series_a
            .iter()
            .zip(series_b)
            .any(|(a, b)| a.timestamp != b.timestamp);

    let (Some(first_a), Some(first_b)) = (series_a.first(), series_b.first()) else {
        if misaligned {
            return Err(alignment_error(series_a, series_b));
        }
        return Ok(Vec::new());
    };
    if misaligned {
        return Err(alignment_error(series_a, series_b));
    }

    let object_a = &first_a.object;
    let object_b = &first_b.object;

    Ok(series_a
        .iter()
        .zip(series_b)
        .filter_map(|(a, b)| {
            let distance_km = round3(distance(&a.position_km, &b.position_km));
            options.emits(distance_km).then(|| CloseApproachEvent {
                time: a.timestamp,
                object_a: object_a.clone(),
                object_b: object_b.clone(),
                distance_km,
            })
        })
        .collect())
}

/// Screen every tracked object against every hazard.
///
/// Each object is propagated once on a shared grid. Objects whose elements
/// fail to propagate are reported once in [`ScanReport::failures`] and skipped;
/// an unavailable oracle aborts the scan.
pub fn scan_catalog(
    oracle: &dyn PropagationOracle,
    tracked: &[OrbitalElement],
    hazards: &[OrbitalElement],
    options: &ScanOptions,
    start_time: Option<DateTime<Utc>>,
) -> Result<ScanReport, ScanError> {
    let grid = options.grid(start_time.unwrap_or_else(Utc::now))?;
    let mut report = ScanReport::new(&grid);

    log::info!(
        "Scanning {} tracked objects against {} hazards ({} samples each)",
        tracked.len(),
        hazards.len(),
        grid.len()
    );

    let tracked_series = sample_catalog(oracle, tracked, &grid, &mut report)?;
    let hazard_series = sample_catalog(oracle, hazards, &grid, &mut report)?;

    for series_a in &tracked_series {
        for series_b in &hazard_series {
            let result = compare_series(series_a, series_b, options);
            record_pair(&mut report, series_a, series_b, result);
        }
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

fn sample_catalog(
    oracle: &dyn PropagationOracle,
    elements: &[OrbitalElement],
    grid: &SampleGrid,
    report: &mut ScanReport,
) -> Result<Vec<Vec<PositionSample>>, ScanError> {
    let mut series = Vec::with_capacity(elements.len());
    for element in elements {
        if let Some(samples) = isolate(element, sample(oracle, element, grid), report)? {
            series.push(samples);
        }
    }
    Ok(series)
}

/// Per-object failure isolation: malformed elements are recorded and skipped,
/// everything else is fatal.
pub(super) fn isolate(
    element: &OrbitalElement,
    result: Result<Vec<PositionSample>, PropagationError>,
    report: &mut ScanReport,
) -> Result<Option<Vec<PositionSample>>, ScanError> {
    let e = match result {
        Ok(samples) => return Ok(Some(samples)),
        Err(e) => ScanError::from(e),
    };
    if e.is_fatal() {
        return Err(e);
    }

    log::warn!("Skipping {}: {}", element.name, e);
    report.failures.push(ScanFailure {
        object: ObjectIdentity::from(element),
        counterpart: None,
        reason: e.to_string(),
    });
    Ok(None)
}

/// Fold one pair's outcome into the report. Only alignment failures reach
/// here; they void the pair, not the scan.
pub(super) fn record_pair(
    report: &mut ScanReport,
    series_a: &[PositionSample],
    series_b: &[PositionSample],
    result: Result<Vec<CloseApproachEvent>, ScanError>,
) {
    report.pairs_scanned += 1;
    match result {
        Ok(events) => report.events.extend(events),
        Err(e) => {
            log::error!("{}", e);
            report.failures.push(ScanFailure {
                object: identity_of(series_a),
                counterpart: Some(identity_of(series_b)),
                reason: e.to_string(),
            });
        }
    }
}

fn alignment_error(series_a: &[PositionSample], series_b: &[PositionSample]) -> ScanError {
    ScanError::Alignment {
        object_a: identity_of(series_a),
        object_b: identity_of(series_b),
        len_a: series_a.len(),
        len_b: series_b.len(),
    }
}

fn identity_of(series: &[PositionSample]) -> ObjectIdentity {
    series
        .first()
        .map(|s| s.object.clone())
        .unwrap_or_else(|| ObjectIdentity {
            name: "<empty series>".into(),
            norad_id: None,
        })
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
