use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{CatalogEntry, ObjectType};

/// Debris clouds tracked by name fragment, in match order.
const DEBRIS_ORIGINS: [(&str, &str); 4] = [
    ("COSMOS-1408", "cosmos_1408"),
    ("FENGYUN-1C", "fengyun_1c"),
    ("IRIDIUM-33", "iridium_33"),
    ("COSMOS-2251", "cosmos_2251"),
];

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SatelliteStats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DebrisStats {
    pub total_debris: usize,
    pub by_origin: BTreeMap<String, usize>,
    pub high_priority: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SystemSummary {
    pub total_satellites: usize,
    pub total_debris: usize,
    pub total_cdm: usize,
    pub close_approaches: usize,
    pub collision_alerts: usize,
    pub last_tle_fetch_time: Option<DateTime<Utc>>,
}

pub fn satellite_stats(entries: &[CatalogEntry]) -> SatelliteStats {
    let mut by_type = BTreeMap::new();
    for entry in entries {
        *by_type.entry(entry.object_type.to_string()).or_insert(0) += 1;
    }
    SatelliteStats {
        total: entries.len(),
        by_type,
    }
}

pub fn debris_stats(entries: &[CatalogEntry]) -> DebrisStats {
    let mut by_origin = BTreeMap::new();
    let mut total_debris = 0;
    let mut high_priority = 0;

    for entry in entries.iter().filter(|e| e.object_type == ObjectType::Debris) {
        total_debris += 1;
        let name = normalise(entry.name());

        let origin = DEBRIS_ORIGINS
            .iter()
            .find(|(fragment, _)| name.contains(fragment))
            .map(|(_, key)| *key)
            .unwrap_or("other");
        *by_origin.entry(origin.to_string()).or_insert(0) += 1;

        if name.contains("COSMOS") || name.contains("FENGYUN") {
            high_priority += 1;
        }
    }

    DebrisStats {
        total_debris,
        by_origin,
        high_priority,
    }
}

// CelesTrak names the clouds both "COSMOS 1408 DEB" and "COSMOS-1408 DEB".
fn normalise(name: &str) -> String {
    name.to_uppercase().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OrbitalElement;

    fn entry(name: &str, object_type: ObjectType) -> CatalogEntry {
        CatalogEntry {
            norad_id: 1,
            element: OrbitalElement::new(name, "1", "2"),
            object_type,
            source: "test".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn counts_objects_by_type() {
        let entries = vec![
            entry("ISS (ZARYA)", ObjectType::Payload),
            entry("STARLINK-1007", ObjectType::Payload),
            entry("CZ-4C R/B", ObjectType::RocketBody),
        ];

        let stats = satellite_stats(&entries);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_type["PAYLOAD"], 2);
        assert_eq!(stats.by_type["ROCKET BODY"], 1);
    }

    #[test]
    fn groups_debris_by_origin() {
        let entries = vec![
            entry("COSMOS 1408 DEB", ObjectType::Debris),
            entry("COSMOS-1408 DEB", ObjectType::Debris),
            entry("FENGYUN 1C DEB", ObjectType::Debris),
            entry("IRIDIUM 33 DEB", ObjectType::Debris),
            entry("COSMOS 2251 DEB", ObjectType::Debris),
            entry("SL-8 DEB", ObjectType::Debris),
            entry("ISS (ZARYA)", ObjectType::Payload),
        ];

        let stats = debris_stats(&entries);

        assert_eq!(stats.total_debris, 6);
        assert_eq!(stats.by_origin["cosmos_1408"], 2);
        assert_eq!(stats.by_origin["fengyun_1c"], 1);
        assert_eq!(stats.by_origin["iridium_33"], 1);
        assert_eq!(stats.by_origin["cosmos_2251"], 1);
        assert_eq!(stats.by_origin["other"], 1);
        assert_eq!(stats.high_priority, 4);
    }
}
