mod stats;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogEntry, ObjectType};
use crate::conjunction::{Cdm, CdmAlert, CloseApproachEvent};

pub use stats::{debris_stats, satellite_stats, DebrisStats, SatelliteStats, SystemSummary};

const CATALOG_FILE: &str = "catalog.yaml";
const APPROACHES_FILE: &str = "close_approaches.json";
const CDM_FILE: &str = "cdm.yaml";
const CDM_ALERTS_FILE: &str = "cdm_alerts.yaml";
const METADATA_FILE: &str = "tle_metadata.yaml";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TleMetadata {
    last_fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Catalog query filters. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub norad_id: Option<u32>,
    /// Case-insensitive substring of the object name.
    pub name: Option<String>,
    pub object_type: Option<ObjectType>,
    pub created_on: Option<NaiveDate>,
    pub updated_on: Option<NaiveDate>,
}

impl CatalogFilter {
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.norad_id.map_or(true, |id| entry.norad_id == id)
            && self.name.as_ref().map_or(true, |name| {
                entry.name().to_lowercase().contains(&name.to_lowercase())
            })
            && self.object_type.map_or(true, |t| entry.object_type == t)
            && self.created_on.map_or(true, |d| entry.created_at.date_naive() == d)
            && self.updated_on.map_or(true, |d| entry.updated_at.date_naive() == d)
    }
}

/// File-backed store for the catalog, screening results and CDM data.
///
/// Each collection lives in its own file under `base`; writers are serialised.
pub struct Storage {
    base: PathBuf,
    write_lock: Mutex<()>,
}

impl Storage {
    pub fn new(base: PathBuf) -> Self {
        Storage {
            base,
            write_lock: Mutex::new(()),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.base.join(file)
    }

    fn read_yaml<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StorageError> {
        let path = self.path(file);
        if !path.exists() {
            return Ok(T::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn write_yaml<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StorageError> {
        let content = serde_yaml::to_string(value)?;
        self.write_atomic(file, content.as_bytes())
    }

    fn read_json<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StorageError> {
        let path = self.path(file);
        if !path.exists() {
            return Ok(T::default());
        }
        let content = std::fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StorageError> {
        let content = serde_json::to_vec(value)?;
        self.write_atomic(file, &content)
    }

    fn write_atomic(&self, file: &str, content: &[u8]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.base)?;
        let tmp = self.path(&format!(".{}.tmp", file));
        std::fs::write(&tmp, content)?;
        std::fs::rename(tmp, self.path(file))?;
        Ok(())
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    // Catalog

    pub fn catalog(&self) -> Result<Vec<CatalogEntry>, StorageError> {
        self.read_yaml(CATALOG_FILE)
    }

    pub fn query_catalog(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>, StorageError> {
        Ok(self
            .catalog()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect())
    }

    pub fn find_object(&self, norad_id: u32) -> Result<CatalogEntry, StorageError> {
        self.catalog()?
            .into_iter()
            .find(|e| e.norad_id == norad_id)
            .ok_or_else(|| StorageError::NotFound(format!("NORAD {}", norad_id)))
    }

    /// Insert or refresh entries by NORAD id. Existing entries keep their
    /// `created_at`.
    pub fn upsert_catalog(
        &self,
        entries: Vec<CatalogEntry>,
    ) -> Result<UpsertSummary, StorageError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut by_id: BTreeMap<u32, CatalogEntry> = self
            .catalog()?
            .into_iter()
            .map(|e| (e.norad_id, e))
            .collect();

        let mut summary = UpsertSummary::default();
        for entry in entries {
            match by_id.get_mut(&entry.norad_id) {
                Some(existing) => {
                    existing.element = entry.element;
                    existing.object_type = entry.object_type;
                    existing.source = entry.source;
                    existing.updated_at = entry.updated_at;
                    summary.updated += 1;
                }
                None => {
                    by_id.insert(entry.norad_id, entry);
                    summary.inserted += 1;
                }
            }
        }

        let catalog: Vec<_> = by_id.into_values().collect();
        self.write_yaml(CATALOG_FILE, &catalog)?;
        Ok(summary)
    }

    // Close approaches

    pub fn close_approaches(&self) -> Result<Vec<CloseApproachEvent>, StorageError> {
        self.read_json(APPROACHES_FILE)
    }

    /// Swap the stored approaches for `events` in one write, dropping
    /// duplicate keys. Returns how many were stored.
    pub fn replace_approaches(&self, events: &[CloseApproachEvent]) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut keys = HashSet::new();
        let unique: Vec<_> = events
            .iter()
            .filter(|e| keys.insert(e.key()))
            .cloned()
            .collect();

        self.write_json(APPROACHES_FILE, &unique)?;
        Ok(unique.len())
    }

    /// Insert events whose (object_a, object_b, time) key is not stored yet.
    /// Returns how many were inserted.
    pub fn insert_approaches(&self, events: &[CloseApproachEvent]) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut stored = self.close_approaches()?;
        let mut keys: HashSet<_> = stored.iter().map(|e| e.key()).collect();
        let before = stored.len();

        for event in events {
            if keys.insert(event.key()) {
                stored.push(event.clone());
            }
        }

        let inserted = stored.len() - before;
        if inserted > 0 {
            self.write_json(APPROACHES_FILE, &stored)?;
        }
        Ok(inserted)
    }

    /// Stored approaches between two objects in either role, oldest first.
    pub fn approaches_between(
        &self,
        norad_a: u32,
        norad_b: u32,
    ) -> Result<Vec<CloseApproachEvent>, StorageError> {
        let mut events: Vec<_> = self
            .close_approaches()?
            .into_iter()
            .filter(|e| e.involves(norad_a) && e.involves(norad_b))
            .collect();
        events.sort_by_key(|e| e.time);
        Ok(events)
    }

    /// The `limit` closest non-zero approaches.
    pub fn top_approaches(&self, limit: usize) -> Result<Vec<CloseApproachEvent>, StorageError> {
        let mut events: Vec<_> = self
            .close_approaches()?
            .into_iter()
            .filter(|e| e.distance_km > 0.0)
            .collect();
        events.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        events.truncate(limit);
        Ok(events)
    }

    // Conjunction data messages

    pub fn cdms(&self) -> Result<Vec<Cdm>, StorageError> {
        self.read_yaml(CDM_FILE)
    }

    /// Store CDMs, replacing any with the same id. Returns how many were new.
    pub fn upsert_cdms(&self, cdms: Vec<Cdm>) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut by_id: BTreeMap<String, Cdm> =
            self.cdms()?.into_iter().map(|c| (c.id.clone(), c)).collect();
        let before = by_id.len();
        for cdm in cdms {
            by_id.insert(cdm.id.clone(), cdm);
        }
        let added = by_id.len() - before;

        let cdms: Vec<_> = by_id.into_values().collect();
        self.write_yaml(CDM_FILE, &cdms)?;
        Ok(added)
    }

    pub fn cdm_alerts(&self) -> Result<Vec<CdmAlert>, StorageError> {
        self.read_yaml(CDM_ALERTS_FILE)
    }

    pub fn insert_cdm_alerts(&self, alerts: Vec<CdmAlert>) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut stored = self.cdm_alerts()?;
        let mut seen: HashSet<String> = stored.iter().map(|a| a.cdm_id.clone()).collect();
        let before = stored.len();
        for alert in alerts {
            if seen.insert(alert.cdm_id.clone()) {
                stored.push(alert);
            }
        }

        let inserted = stored.len() - before;
        if inserted > 0 {
            self.write_yaml(CDM_ALERTS_FILE, &stored)?;
        }
        Ok(inserted)
    }

    // Fetch metadata

    pub fn last_fetched_at(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.read_yaml::<TleMetadata>(METADATA_FILE)?.last_fetched_at)
    }

    pub fn mark_fetched(&self, at: DateTime<Utc>) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap();
        self.write_yaml(
            METADATA_FILE,
            &TleMetadata {
                last_fetched_at: Some(at),
            },
        )
    }

    pub fn summary(&self) -> Result<SystemSummary, StorageError> {
        let catalog = self.catalog()?;
        Ok(SystemSummary {
            total_satellites: catalog.len(),
            total_debris: catalog
                .iter()
                .filter(|e| e.object_type == ObjectType::Debris)
                .count(),
            total_cdm: self.cdms()?.len(),
            close_approaches: self.close_approaches()?.len(),
            collision_alerts: self.cdm_alerts()?.len(),
            last_tle_fetch_time: self.last_fetched_at()?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::catalog::OrbitalElement;
    use crate::conjunction::{evaluate_cdms, CdmAlertPolicy, ObjectIdentity};

    pub(crate) fn temp_storage() -> Storage {
        let folder = format!("conjunction-watch-{}", uuid::Uuid::new_v4());
        Storage::new(std::env::temp_dir().join(folder))
    }

    fn entry(
        norad_id: u32,
        name: &str,
        object_type: ObjectType,
        at: DateTime<Utc>,
    ) -> CatalogEntry {
        CatalogEntry {
            norad_id,
            element: OrbitalElement::new(name, format!("1 {:05}U", norad_id), "2"),
            object_type,
            source: "test".into(),
            created_at: at,
            updated_at: at,
        }
    }

    fn identity(name: &str, norad_id: u32) -> ObjectIdentity {
        ObjectIdentity {
            name: name.into(),
            norad_id: Some(norad_id),
        }
    }

    fn event(minute: i64, a: u32, b: u32, distance_km: f64) -> CloseApproachEvent {
        CloseApproachEvent {
            time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
            object_a: identity(&format!("SAT-{}", a), a),
            object_b: identity(&format!("DEB-{}", b), b),
            distance_km,
        }
    }

    #[test]
    fn empty_store_reads_as_empty() {
        let storage = temp_storage();
        assert!(storage.catalog().unwrap().is_empty());
        assert!(storage.close_approaches().unwrap().is_empty());
        assert_eq!(storage.last_fetched_at().unwrap(), None);
    }

    #[test]
    fn upsert_keeps_created_at_and_counts_changes() {
        let storage = temp_storage();
        let day1 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let day2 = day1 + Duration::days(1);

        let first = storage
            .upsert_catalog(vec![
                entry(25544, "ISS (ZARYA)", ObjectType::Payload, day1),
                entry(49863, "COSMOS 1408 DEB", ObjectType::Debris, day1),
            ])
            .unwrap();
        let second = storage
            .upsert_catalog(vec![
                entry(25544, "ISS", ObjectType::Payload, day2),
                entry(48274, "CSS (TIANHE)", ObjectType::Payload, day2),
            ])
            .unwrap();

        assert_eq!(first, UpsertSummary { inserted: 2, updated: 0 });
        assert_eq!(second, UpsertSummary { inserted: 1, updated: 1 });

        let iss = storage.find_object(25544).unwrap();
        assert_eq!(iss.name(), "ISS");
        assert_eq!(iss.created_at, day1);
        assert_eq!(iss.updated_at, day2);
        assert!(matches!(storage.find_object(1), Err(StorageError::NotFound(_))));

        std::fs::remove_dir_all(storage.base()).unwrap();
    }

    #[test]
    fn catalog_filters_combine() {
        let storage = temp_storage();
        let day1 = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();
        storage
            .upsert_catalog(vec![
                entry(25544, "ISS (ZARYA)", ObjectType::Payload, day1),
                entry(49863, "COSMOS 1408 DEB", ObjectType::Debris, day1),
                entry(49864, "COSMOS 1408 DEB", ObjectType::Debris, day1 + Duration::days(3)),
            ])
            .unwrap();

        let by_name = storage
            .query_catalog(&CatalogFilter {
                name: Some("cosmos".into()),
                ..Default::default()
            })
            .unwrap();
        let by_day = storage
            .query_catalog(&CatalogFilter {
                object_type: Some(ObjectType::Debris),
                created_on: Some(day1.date_naive()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(by_name.len(), 2);
        assert_eq!(by_day.len(), 1);
        assert_eq!(by_day[0].norad_id, 49863);

        std::fs::remove_dir_all(storage.base()).unwrap();
    }

    #[test]
    fn approaches_are_inserted_once_per_key() {
        let storage = temp_storage();

        let first = storage
            .insert_approaches(&[event(0, 1, 2, 3.5), event(10, 1, 2, 2.5)])
            .unwrap();
        let second = storage
            .insert_approaches(&[event(10, 1, 2, 9.9), event(20, 1, 2, 1.5)])
            .unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 1);
        let stored = storage.close_approaches().unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1].distance_km, 2.5);

        let replaced = storage
            .replace_approaches(&[event(30, 4, 5, 0.7), event(30, 4, 5, 0.7)])
            .unwrap();
        assert_eq!(replaced, 1);
        assert_eq!(storage.close_approaches().unwrap(), vec![event(30, 4, 5, 0.7)]);

        storage.replace_approaches(&[]).unwrap();
        assert!(storage.close_approaches().unwrap().is_empty());

        std::fs::remove_dir_all(storage.base()).unwrap();
    }

    #[test]
    fn top_and_pair_queries_sort_results() {
        let storage = temp_storage();
        storage
            .insert_approaches(&[
                event(20, 1, 2, 3.0),
                event(0, 1, 2, 0.0),
                event(10, 1, 2, 1.0),
                event(0, 1, 3, 0.5),
                event(10, 4, 3, 7.0),
            ])
            .unwrap();

        let top: Vec<_> = storage
            .top_approaches(3)
            .unwrap()
            .iter()
            .map(|e| e.distance_km)
            .collect();
        assert_eq!(top, vec![0.5, 1.0, 3.0]);

        let pair = storage.approaches_between(2, 1).unwrap();
        assert_eq!(pair.len(), 3);
        assert!(pair.windows(2).all(|w| w[0].time <= w[1].time));

        std::fs::remove_dir_all(storage.base()).unwrap();
    }

    #[test]
    fn cdm_alerts_are_deduplicated_and_summarised() {
        let storage = temp_storage();
        let now = Utc::now();
        let cdms = vec![
            crate::conjunction::tests_support::cdm("A", now, Some(0.4), None),
            crate::conjunction::tests_support::cdm("B", now, Some(20.0), None),
        ];
        assert_eq!(storage.upsert_cdms(cdms.clone()).unwrap(), 2);
        assert_eq!(storage.upsert_cdms(cdms).unwrap(), 0);

        let policy = CdmAlertPolicy::default();
        let alerts = evaluate_cdms(&storage.cdms().unwrap(), &policy, &HashSet::new(), now);
        assert_eq!(storage.insert_cdm_alerts(alerts.clone()).unwrap(), 1);
        assert_eq!(storage.insert_cdm_alerts(alerts).unwrap(), 0);

        storage.mark_fetched(now).unwrap();
        storage
            .upsert_catalog(vec![entry(49863, "COSMOS 1408 DEB", ObjectType::Debris, now)])
            .unwrap();
        let summary = storage.summary().unwrap();
        assert_eq!(summary.total_satellites, 1);
        assert_eq!(summary.total_debris, 1);
        assert_eq!(summary.total_cdm, 2);
        assert_eq!(summary.collision_alerts, 1);
        assert_eq!(summary.last_tle_fetch_time, Some(now));

        std::fs::remove_dir_all(storage.base()).unwrap();
    }
}
