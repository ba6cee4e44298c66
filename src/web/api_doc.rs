use utoipa::OpenApi;

use super::api::cdm::IngestResponse;
use super::api::collisions::{PairQuery, ScanStartedResponse, TopQuery};
use super::api::error::ErrorResponse;
use super::api::satellites::{CatalogQuery, SatelliteDetail};
use super::api::summary::SummaryResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::satellites::list_satellites,
        super::api::satellites::get_satellite_stats,
        super::api::satellites::get_satellite,
        super::api::satellites::list_debris,
        super::api::satellites::get_debris_stats,
        super::api::satellites::get_debris,
        super::api::collisions::start_collision_scan,
        super::api::collisions::get_collision,
        super::api::collisions::get_top_collisions,
        super::api::cdm::list_cdms,
        super::api::cdm::ingest_cdms,
        super::api::cdm::list_collision_alerts,
        super::api::summary::get_summary,
    ),
    components(
        schemas(
            CatalogQuery,
            SatelliteDetail,
            PairQuery,
            TopQuery,
            ScanStartedResponse,
            IngestResponse,
            SummaryResponse,
            ErrorResponse,
            crate::catalog::CatalogEntry,
            crate::catalog::ObjectType,
            crate::catalog::OrbitalElement,
            crate::conjunction::CloseApproachEvent,
            crate::conjunction::ObjectIdentity,
            crate::conjunction::Cdm,
            crate::conjunction::CdmAlert,
            crate::conjunction::RiskLevel,
            crate::storage::SatelliteStats,
            crate::storage::DebrisStats,
            crate::storage::SystemSummary,
        )
    ),
    info(
        title = "Conjunction Watch API",
        description = "Orbital catalog, close-approach screening and CDM alerts",
        version = "0.1.0"
    ),
    tags(
        (name = "catalog", description = "Tracked objects and debris"),
        (name = "collisions", description = "Close-approach screening"),
        (name = "cdm", description = "Conjunction data messages and alerts"),
        (name = "summary", description = "System overview")
    )
)]
pub struct ApiDoc;
