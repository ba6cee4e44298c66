use chrono::{DateTime, Utc};
use serde::Deserialize;
use sgp4::{Constants, Elements};

use super::error::PropagationError;
use crate::catalog::OrbitalElement;

/// Turns an element set and a list of instants into inertial positions (km).
///
/// Implementations must return exactly one position per timestamp, in the same
/// order, and must fail instead of producing placeholder vectors.
pub trait PropagationOracle: Send + Sync {
    fn propagate(
        &self,
        element: &OrbitalElement,
        timestamps: &[DateTime<Utc>],
    ) -> Result<Vec<[f64; 3]>, PropagationError>;
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Sgp4Options {
    /// Reproduce the AFSPC reference implementation quirks.
    #[serde(default)]
    pub afspc_compatibility_mode: bool,
}

/// SGP4/SDP4 propagation in the TEME frame.
#[derive(Debug, Clone, Default)]
pub struct Sgp4Oracle {
    options: Sgp4Options,
}

impl Sgp4Oracle {
    pub fn new(options: Sgp4Options) -> Self {
        Self { options }
    }

    fn constants(
        &self,
        element: &OrbitalElement,
    ) -> Result<(Elements, Constants), PropagationError> {
        let elements = Elements::from_tle(
            Some(element.name.clone()),
            element.line1.as_bytes(),
            element.line2.as_bytes(),
        )
        .map_err(|e| PropagationError::malformed(&element.name, e))?;

        let constants = if self.options.afspc_compatibility_mode {
            Constants::from_elements_afspc_compatibility_mode(&elements)
        } else {
            Constants::from_elements(&elements)
        }
        .map_err(|e| PropagationError::malformed(&element.name, e))?;

        Ok((elements, constants))
    }
}

impl PropagationOracle for Sgp4Oracle {
    fn propagate(
        &self,
        element: &OrbitalElement,
        timestamps: &[DateTime<Utc>],
    ) -> Result<Vec<[f64; 3]>, PropagationError> {
        let (elements, constants) = self.constants(element)?;

        timestamps
            .iter()
            .map(|timestamp| {
                let minutes = elements
                    .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
                    .map_err(|e| PropagationError::malformed(&element.name, e))?;
                let prediction = constants
                    .propagate(minutes)
                    .map_err(|e| PropagationError::malformed(&element.name, e))?;
                Ok(prediction.position)
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic oracles for exercising the sampler and scanner without SGP4.

    use chrono::{DateTime, TimeZone, Utc};
    use std::f64::consts::PI;

    use super::PropagationOracle;
    use crate::catalog::OrbitalElement;
    use crate::propagation::PropagationError;

    const MU_KM3_S2: f64 = 398_600.4418;

    /// Circular Keplerian orbits built from the line-2 angles and mean motion,
    /// anchored at a fixed reference instant.
    pub struct CircularOrbitOracle;

    impl CircularOrbitOracle {
        pub fn reference_epoch() -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2020, 7, 12, 0, 0, 0).unwrap()
        }
    }

    fn field(line: &str, range: std::ops::Range<usize>) -> Option<f64> {
        line.get(range)?.trim().parse().ok()
    }

    impl PropagationOracle for CircularOrbitOracle {
        fn propagate(
            &self,
            element: &OrbitalElement,
            timestamps: &[DateTime<Utc>],
        ) -> Result<Vec<[f64; 3]>, PropagationError> {
            let line2 = &element.line2;
            let parsed = (|| {
                Some((
                    field(line2, 8..16)?.to_radians(),
                    field(line2, 17..25)?.to_radians(),
                    field(line2, 43..51)?.to_radians(),
                    field(line2, 52..63)?,
                ))
            })();
            let Some((inc, raan, anomaly, revs_per_day)) = parsed else {
                return Err(PropagationError::malformed(&element.name, "unparsable line 2"));
            };

            let n = revs_per_day * 2.0 * PI / 86_400.0;
            let r = (MU_KM3_S2 / (n * n)).cbrt();
            let epoch = Self::reference_epoch();

            Ok(timestamps
                .iter()
                .map(|t| {
                    let dt = (*t - epoch).num_milliseconds() as f64 / 1000.0;
                    let u = anomaly + n * dt;
                    [
                        r * (raan.cos() * u.cos() - raan.sin() * u.sin() * inc.cos()),
                        r * (raan.sin() * u.cos() + raan.cos() * u.sin() * inc.cos()),
                        r * u.sin() * inc.sin(),
                    ]
                })
                .collect())
        }
    }

    /// An oracle whose backing data is missing.
    pub struct UnavailableOracle;

    impl PropagationOracle for UnavailableOracle {
        fn propagate(
            &self,
            _element: &OrbitalElement,
            _timestamps: &[DateTime<Utc>],
        ) -> Result<Vec<[f64; 3]>, PropagationError> {
            Err(PropagationError::OracleUnavailable(
                "ephemeris data missing".into(),
            ))
        }
    }

    /// Builds a well-formed line 2 for [`CircularOrbitOracle`].
    pub fn circular_element(
        name: &str,
        norad_id: u32,
        inclination_deg: f64,
        raan_deg: f64,
        anomaly_deg: f64,
        revs_per_day: f64,
    ) -> OrbitalElement {
        OrbitalElement::new(
            name,
            format!(
                "1 {:05}U 20001A   20194.00000000  .00000000  00000-0  00000-0 0  9990",
                norad_id
            ),
            format!(
                "2 {:05} {:8.4} {:8.4} 0000001 000.0000 {:8.4} {:11.8}    10",
                norad_id, inclination_deg, raan_deg, anomaly_deg, revs_per_day
            ),
        )
    }

    pub fn malformed_element(name: &str) -> OrbitalElement {
        OrbitalElement::new(name, "1 garbage", "2 garbage")
    }
}
