use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;

use crate::catalog::OrbitalElement;
use crate::propagation::{SampleGrid, DEFAULT_DURATION_HOURS, DEFAULT_INTERVAL_MINUTES};

pub const DEFAULT_THRESHOLD_KM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct ObjectIdentity {
    pub name: String,
    pub norad_id: Option<u32>,
}

impl From<&OrbitalElement> for ObjectIdentity {
    fn from(element: &OrbitalElement) -> Self {
        Self {
            name: element.name.clone(),
            norad_id: element.norad_id(),
        }
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.norad_id {
            Some(id) => write!(f, "{} ({})", self.name, id),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Distance between two objects at one sampled instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CloseApproachEvent {
    #[serde(serialize_with = "serialize_utc_z")]
    pub time: DateTime<Utc>,
    pub object_a: ObjectIdentity,
    pub object_b: ObjectIdentity,
    pub distance_km: f64,
}

impl CloseApproachEvent {
    /// Persistence key: (object_a, object_b, time).
    pub fn key(&self) -> (ObjectIdentity, ObjectIdentity, String) {
        (
            self.object_a.clone(),
            self.object_b.clone(),
            format_utc_z(&self.time),
        )
    }

    pub fn involves(&self, norad_id: u32) -> bool {
        self.object_a.norad_id == Some(norad_id) || self.object_b.norad_id == Some(norad_id)
    }
}

pub fn format_utc_z(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn serialize_utc_z<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_utc_z(time))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Emit every sampled instant; filtering is left to the consumer.
    #[default]
    ReportAll,
    /// Emit only instants at or below `threshold_km`.
    BreachesOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScanOptions {
    #[serde(default = "default_duration_hours")]
    pub duration_hours: f64,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default = "default_threshold_km")]
    pub threshold_km: f64,
    #[serde(default)]
    pub threshold_mode: ThresholdMode,
}

fn default_duration_hours() -> f64 {
    DEFAULT_DURATION_HOURS
}

fn default_interval_minutes() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_threshold_km() -> f64 {
    DEFAULT_THRESHOLD_KM
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration_hours: DEFAULT_DURATION_HOURS,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            threshold_km: DEFAULT_THRESHOLD_KM,
            threshold_mode: ThresholdMode::ReportAll,
        }
    }
}

impl ScanOptions {
    pub fn grid(
        &self,
        start: DateTime<Utc>,
    ) -> Result<SampleGrid, crate::propagation::PropagationError> {
        SampleGrid::new(start, self.duration_hours, self.interval_minutes)
    }

    pub fn emits(&self, distance_km: f64) -> bool {
        match self.threshold_mode {
            ThresholdMode::ReportAll => true,
            ThresholdMode::BreachesOnly => distance_km <= self.threshold_km,
        }
    }
}

/// An object or pair that was left out of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScanFailure {
    pub object: ObjectIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterpart: Option<ObjectIdentity>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanReport {
    pub scan_id: String,
    pub grid_start: DateTime<Utc>,
    pub grid_steps: usize,
    pub pairs_scanned: usize,
    pub events: Vec<CloseApproachEvent>,
    pub failures: Vec<ScanFailure>,
    /// False when the scan stopped early at its deadline.
    pub complete: bool,
}

impl ScanReport {
    pub fn new(grid: &SampleGrid) -> Self {
        Self {
            scan_id: uuid::Uuid::new_v4().to_string(),
            grid_start: grid.start(),
            grid_steps: grid.len(),
            pairs_scanned: 0,
            events: Vec::new(),
            failures: Vec::new(),
            complete: true,
        }
    }

    /// Events ordered by ascending distance, closest first.
    pub fn closest(&self, limit: usize) -> Vec<&CloseApproachEvent> {
        let mut events: Vec<_> = self.events.iter().collect();
        events.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        events.truncate(limit);
        events
    }
}
