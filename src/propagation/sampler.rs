use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;

use super::error::PropagationError;
use super::oracle::PropagationOracle;
use crate::catalog::OrbitalElement;
use crate::conjunction::ObjectIdentity;

pub const DEFAULT_DURATION_HOURS: f64 = 24.0;
pub const DEFAULT_INTERVAL_MINUTES: u32 = 10;

/// Evenly spaced sampling instants shared by every object in one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleGrid {
    start: DateTime<Utc>,
    interval: Duration,
    steps: usize,
}

impl SampleGrid {
    /// `floor(duration_hours * 60 / interval_minutes)` steps starting at
    /// `start`, truncated to whole seconds.
    pub fn new(
        start: DateTime<Utc>,
        duration_hours: f64,
        interval_minutes: u32,
    ) -> Result<Self, PropagationError> {
        if interval_minutes == 0 {
            return Err(PropagationError::InvalidGrid(
                "interval_minutes must be positive".into(),
            ));
        }
        if !duration_hours.is_finite() || duration_hours < 0.0 {
            return Err(PropagationError::InvalidGrid(format!(
                "duration_hours must be a non-negative number, got {}",
                duration_hours
            )));
        }

        let steps = (duration_hours * 60.0 / interval_minutes as f64).floor();
        if steps > i32::MAX as f64 {
            return Err(PropagationError::InvalidGrid(format!(
                "{} steps exceeds the supported grid size",
                steps
            )));
        }

        let start = start.trunc_subsecs(0);
        let interval = Duration::minutes(interval_minutes as i64);
        let steps = steps as i32;
        let end = interval
            .checked_mul(steps)
            .and_then(|span| start.checked_add_signed(span));
        if end.is_none() {
            return Err(PropagationError::InvalidGrid(format!(
                "{} steps of {} min from {} leave the representable time range",
                steps, interval_minutes, start
            )));
        }

        Ok(Self {
            start,
            interval,
            steps: steps as usize,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn len(&self) -> usize {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        // Bounds are checked in `new`, so no offset can overflow here.
        (0..self.steps as i32)
            .filter_map(|i| {
                self.interval
                    .checked_mul(i)
                    .and_then(|offset| self.start.checked_add_signed(offset))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSample {
    pub timestamp: DateTime<Utc>,
    pub position_km: [f64; 3],
    pub object: ObjectIdentity,
}

/// Propagate one object over the grid.
///
/// The oracle is called once with the whole grid. Any oracle failure is
/// returned as-is; no partial series is produced.
pub fn sample(
    oracle: &dyn PropagationOracle,
    element: &OrbitalElement,
    grid: &SampleGrid,
) -> Result<Vec<PositionSample>, PropagationError> {
    let timestamps = grid.timestamps();
    let positions = oracle.propagate(element, &timestamps)?;

    if positions.len() != timestamps.len() {
        return Err(PropagationError::OracleUnavailable(format!(
            "oracle returned {} positions for {} timestamps ({})",
            positions.len(),
            timestamps.len(),
            element.name
        )));
    }
    if positions.iter().flatten().any(|c| !c.is_finite()) {
        return Err(PropagationError::malformed(
            &element.name,
            "propagation produced non-finite coordinates",
        ));
    }

    let object = ObjectIdentity::from(element);
    Ok(timestamps
        .into_iter()
        .zip(positions)
        .map(|(timestamp, position_km)| PositionSample {
            timestamp,
            position_km,
            object: object.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::propagation::testing::{circular_element, malformed_element, CircularOrbitOracle};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 7, 12, 6, 30, 0).unwrap()
    }

    #[test]
    fn default_grid_has_144_steps() {
        let grid =
            SampleGrid::new(start(), DEFAULT_DURATION_HOURS, DEFAULT_INTERVAL_MINUTES).unwrap();
        assert_eq!(grid.len(), 144);
    }

    #[test]
    fn hourly_grid_has_24_steps() {
        let grid = SampleGrid::new(start(), 24.0, 60).unwrap();
        assert_eq!(grid.len(), 24);
    }

    #[test]
    fn step_count_is_floored() {
        assert_eq!(SampleGrid::new(start(), 1.0, 7).unwrap().len(), 8);
        assert_eq!(SampleGrid::new(start(), 0.1, 10).unwrap().len(), 0);
        assert_eq!(SampleGrid::new(start(), 2.5, 45).unwrap().len(), 3);
    }

    #[test]
    fn grid_rejects_zero_interval() {
        assert!(matches!(
            SampleGrid::new(start(), 24.0, 0),
            Err(PropagationError::InvalidGrid(_))
        ));
        assert!(SampleGrid::new(start(), f64::NAN, 10).is_err());
    }

    #[test]
    fn grid_rejects_spans_outside_the_time_range() {
        assert!(matches!(
            SampleGrid::new(start(), 1.0e10, 60_000_000),
            Err(PropagationError::InvalidGrid(_))
        ));
        assert!(matches!(
            SampleGrid::new(start(), 1.0e12, 1),
            Err(PropagationError::InvalidGrid(_))
        ));
        assert!(matches!(
            SampleGrid::new(start(), f64::MAX, 1),
            Err(PropagationError::InvalidGrid(_))
        ));
    }

    #[test]
    fn timestamps_are_evenly_spaced_from_start() {
        for (hours, minutes) in [(24.0, 10), (6.0, 15), (12.0, 60), (1.0, 1)] {
            let grid = SampleGrid::new(start(), hours, minutes).unwrap();
            let timestamps = grid.timestamps();

            assert_eq!(timestamps[0], start());
            for pair in timestamps.windows(2) {
                assert_eq!(pair[1] - pair[0], Duration::minutes(minutes as i64));
            }
        }
    }

    #[test]
    fn subsecond_start_is_truncated() {
        let jittered = start() + Duration::milliseconds(734);
        let grid = SampleGrid::new(jittered, 1.0, 10).unwrap();
        assert_eq!(grid.start(), start());
    }

    #[test]
    fn same_start_gives_identical_grids() {
        let a = SampleGrid::new(start(), 24.0, 10).unwrap();
        let b = SampleGrid::new(start(), 24.0, 10).unwrap();
        assert_eq!(a.timestamps(), b.timestamps());
    }

    #[test]
    fn sample_tags_every_position_with_the_object() {
        let element = circular_element("SAT-A", 40001, 53.0, 10.0, 0.0, 15.2);
        let grid = SampleGrid::new(start(), 24.0, 10).unwrap();

        let samples = sample(&CircularOrbitOracle, &element, &grid).unwrap();

        assert_eq!(samples.len(), 144);
        assert!(samples.iter().all(|s| s.object.name == "SAT-A"));
        assert!(samples.iter().all(|s| s.object.norad_id == Some(40001)));
        assert_eq!(samples[1].timestamp, start() + Duration::minutes(10));
    }

    #[test]
    fn malformed_element_yields_no_partial_result() {
        let grid = SampleGrid::new(start(), 24.0, 10).unwrap();
        let result = sample(&CircularOrbitOracle, &malformed_element("JUNK"), &grid);
        assert!(matches!(result, Err(PropagationError::MalformedElement { .. })));
    }
}
