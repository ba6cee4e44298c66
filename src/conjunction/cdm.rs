use std::collections::HashSet;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

/// Conjunction data message as published by the screening provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cdm {
    pub id: String,
    pub created: DateTime<Utc>,
    pub emergency_reportable: String,
    /// Time of closest approach.
    pub tca: DateTime<Utc>,
    /// Minimum range (km).
    pub min_rng: Option<f64>,
    /// Probability of collision.
    pub pc: Option<f64>,
    pub sat_1_id: String,
    pub sat_1_name: String,
    pub sat1_object_type: Option<String>,
    pub sat1_rcs: Option<String>,
    pub sat_1_excl_vol: Option<f64>,
    pub sat_2_id: String,
    pub sat_2_name: String,
    pub sat2_object_type: Option<String>,
    pub sat2_rcs: Option<String>,
    pub sat_2_excl_vol: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Elevated,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CdmAlert {
    pub cdm_id: String,
    pub created: DateTime<Utc>,
    pub tca: DateTime<Utc>,
    pub min_rng: Option<f64>,
    pub pc: Option<f64>,
    pub sat_1_id: String,
    pub sat_1_name: String,
    pub sat_2_id: String,
    pub sat_2_name: String,
    pub risk_level: RiskLevel,
    pub alert_reason: String,
}

impl CdmAlert {
    pub fn involves(&self, norad_id: u32) -> bool {
        let id = norad_id.to_string();
        self.sat_1_id == id || self.sat_2_id == id
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CdmAlertPolicy {
    #[serde(default = "default_max_min_range_km")]
    pub max_min_range_km: f64,
    #[serde(default = "default_min_probability")]
    pub min_probability: f64,
    #[serde(
        default = "default_lookback",
        deserialize_with = "crate::web::config::deserialize_duration"
    )]
    pub lookback: StdDuration,
}

fn default_max_min_range_km() -> f64 {
    2.0
}

fn default_min_probability() -> f64 {
    1e-4
}

fn default_lookback() -> StdDuration {
    StdDuration::from_secs(24 * 3600)
}

impl Default for CdmAlertPolicy {
    fn default() -> Self {
        Self {
            max_min_range_km: default_max_min_range_km(),
            min_probability: default_min_probability(),
            lookback: default_lookback(),
        }
    }
}

/// Raise alerts for recent CDMs that breach the range or probability limits.
/// CDMs listed in `already_alerted` are skipped.
pub fn evaluate_cdms(
    cdms: &[Cdm],
    policy: &CdmAlertPolicy,
    already_alerted: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<CdmAlert> {
    let lookback = Duration::from_std(policy.lookback).unwrap_or(Duration::hours(24));
    let since = now - lookback;

    cdms.iter()
        .filter(|cdm| cdm.created >= since)
        .filter(|cdm| !already_alerted.contains(&cdm.id))
        .filter_map(|cdm| {
            let close = cdm.min_rng.filter(|r| *r < policy.max_min_range_km);
            let likely = cdm.pc.filter(|p| *p > policy.min_probability);

            let (risk_level, alert_reason) = match (close, likely) {
                (None, None) => return None,
                (Some(r), Some(p)) => (
                    RiskLevel::High,
                    format!(
                        "min_rng {} km < {} km and pc {:e} > {:e}",
                        r, policy.max_min_range_km, p, policy.min_probability
                    ),
                ),
                (Some(r), None) => (
                    RiskLevel::Elevated,
                    format!("min_rng {} km < {} km", r, policy.max_min_range_km),
                ),
                (None, Some(p)) => (
                    RiskLevel::Elevated,
                    format!("pc {:e} > {:e}", p, policy.min_probability),
                ),
            };

            Some(CdmAlert {
                cdm_id: cdm.id.clone(),
                created: now,
                tca: cdm.tca,
                min_rng: cdm.min_rng,
                pc: cdm.pc,
                sat_1_id: cdm.sat_1_id.clone(),
                sat_1_name: cdm.sat_1_name.clone(),
                sat_2_id: cdm.sat_2_id.clone(),
                sat_2_name: cdm.sat_2_name.clone(),
                risk_level,
                alert_reason,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;

    use super::*;

    pub(crate) fn cdm(
        id: &str,
        created: DateTime<Utc>,
        min_rng: Option<f64>,
        pc: Option<f64>,
    ) -> Cdm {
        Cdm {
            id: id.into(),
            created,
            emergency_reportable: "Y".into(),
            tca: created + Duration::hours(30),
            min_rng,
            pc,
            sat_1_id: "25544".into(),
            sat_1_name: "ISS (ZARYA)".into(),
            sat1_object_type: Some("PAYLOAD".into()),
            sat1_rcs: Some("LARGE".into()),
            sat_1_excl_vol: Some(5.0),
            sat_2_id: "49863".into(),
            sat_2_name: "COSMOS 1408 DEB".into(),
            sat2_object_type: Some("DEBRIS".into()),
            sat2_rcs: None,
            sat_2_excl_vol: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn alerts_on_range_or_probability() {
        let recent = now() - Duration::hours(2);
        let cdms = vec![
            cdm("both", recent, Some(0.8), Some(3e-3)),
            cdm("range", recent, Some(1.5), Some(1e-6)),
            cdm("prob", recent, Some(9.0), Some(2e-4)),
            cdm("quiet", recent, Some(12.0), Some(1e-7)),
            cdm("unknown", recent, None, None),
        ];

        let alerts = evaluate_cdms(&cdms, &CdmAlertPolicy::default(), &HashSet::new(), now());

        let levels: Vec<_> = alerts.iter().map(|a| (a.cdm_id.as_str(), a.risk_level)).collect();
        assert_eq!(
            levels,
            vec![
                ("both", RiskLevel::High),
                ("range", RiskLevel::Elevated),
                ("prob", RiskLevel::Elevated)
            ]
        );
        assert!(alerts[1].alert_reason.starts_with("min_rng 1.5 km"));
        assert!(alerts[0].involves(49863));
    }

    #[test]
    fn skips_old_and_already_alerted_cdms() {
        let cdms = vec![
            cdm("stale", now() - Duration::hours(30), Some(0.5), None),
            cdm("seen", now() - Duration::hours(1), Some(0.5), None),
            cdm("fresh", now() - Duration::hours(1), Some(0.5), None),
        ];
        let seen: HashSet<String> = ["seen".to_string()].into();

        let alerts = evaluate_cdms(&cdms, &CdmAlertPolicy::default(), &seen, now());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].cdm_id, "fresh");
    }

    #[test]
    fn risk_level_renders_upper_case() {
        assert_eq!(RiskLevel::High.to_string(), "HIGH");
        assert_eq!(serde_json::to_string(&RiskLevel::Elevated).unwrap(), "\"ELEVATED\"");
    }
}
