use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use super::parsing::extract_norad_id;

/// A two-line element set together with the name it was published under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct OrbitalElement {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl OrbitalElement {
    pub fn new(
        name: impl Into<String>,
        line1: impl Into<String>,
        line2: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            line1: line1.into(),
            line2: line2.into(),
        }
    }

    pub fn norad_id(&self) -> Option<u32> {
        extract_norad_id(&self.line1)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, ToSchema,
)]
pub enum ObjectType {
    #[serde(rename = "PAYLOAD")]
    #[strum(serialize = "PAYLOAD")]
    Payload,
    #[serde(rename = "DEBRIS")]
    #[strum(serialize = "DEBRIS")]
    Debris,
    #[serde(rename = "ROCKET BODY")]
    #[strum(serialize = "ROCKET BODY")]
    RocketBody,
    #[serde(rename = "UNKNOWN")]
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

impl ObjectType {
    /// Debris and spent stages are what active objects get screened against.
    pub fn is_hazard(&self) -> bool {
        matches!(self, ObjectType::Debris | ObjectType::RocketBody)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntry {
    pub norad_id: u32,
    #[serde(flatten)]
    pub element: OrbitalElement,
    pub object_type: ObjectType,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        &self.element.name
    }
}

/// Split a catalog into (tracked, hazards) element lists.
pub fn partition(entries: &[CatalogEntry]) -> (Vec<OrbitalElement>, Vec<OrbitalElement>) {
    let mut tracked = Vec::new();
    let mut hazards = Vec::new();
    for entry in entries {
        if entry.object_type.is_hazard() {
            hazards.push(entry.element.clone());
        } else {
            tracked.push(entry.element.clone());
        }
    }
    (tracked, hazards)
}
