use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::{CatalogEntry, ObjectType};
use crate::conjunction::CdmAlert;
use crate::storage::{debris_stats, satellite_stats, CatalogFilter, DebrisStats, SatelliteStats};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::api::ListResponse;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CatalogQuery {
    pub norad_id: Option<u32>,
    pub name: Option<String>,
    pub object_type: Option<ObjectType>,
    /// Creation date, `YYYY-MM-DD`.
    pub created_at: Option<NaiveDate>,
    /// Last update date, `YYYY-MM-DD`.
    pub updated_at: Option<NaiveDate>,
}

impl From<CatalogQuery> for CatalogFilter {
    fn from(q: CatalogQuery) -> Self {
        CatalogFilter {
            norad_id: q.norad_id,
            name: q.name,
            object_type: q.object_type,
            created_on: q.created_at,
            updated_on: q.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SatelliteDetail {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub cdm_alerts: Vec<CdmAlert>,
}

#[utoipa::path(
    get,
    path = "/api/satellites",
    tag = "catalog",
    params(
        ("norad_id" = Option<u32>, Query, description = "Exact NORAD catalog number"),
        ("name" = Option<String>, Query, description = "Case-insensitive name substring"),
        ("object_type" = Option<ObjectType>, Query, description = "Object type"),
        ("created_at" = Option<String>, Query, description = "Creation date (YYYY-MM-DD)"),
        ("updated_at" = Option<String>, Query, description = "Last update date (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Catalog objects in a list envelope", body = [CatalogEntry])
    )
)]
pub async fn list_satellites(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<ListResponse<CatalogEntry>>> {
    let entries = state.storage.query_catalog(&query.into())?;
    Ok(Json(ListResponse::new(entries)))
}

#[utoipa::path(
    get,
    path = "/api/satellites/stats",
    tag = "catalog",
    responses(
        (status = 200, description = "Object counts by type", body = SatelliteStats)
    )
)]
pub async fn get_satellite_stats(State(state): State<AppState>) -> ApiResult<Json<SatelliteStats>> {
    let catalog = state.storage.catalog()?;
    Ok(Json(satellite_stats(&catalog)))
}

#[utoipa::path(
    get,
    path = "/api/satellites/{norad_id}",
    tag = "catalog",
    params(("norad_id" = u32, Path, description = "NORAD catalog number")),
    responses(
        (status = 200, description = "Object with its CDM alerts", body = SatelliteDetail),
        (status = 404, description = "Unknown object", body = ErrorResponse)
    )
)]
pub async fn get_satellite(
    State(state): State<AppState>,
    Path(norad_id): Path<u32>,
) -> ApiResult<Json<SatelliteDetail>> {
    let entry = state.storage.find_object(norad_id)?;
    let cdm_alerts = state
        .storage
        .cdm_alerts()?
        .into_iter()
        .filter(|a| a.involves(norad_id))
        .collect();
    Ok(Json(SatelliteDetail { entry, cdm_alerts }))
}

#[utoipa::path(
    get,
    path = "/api/debris",
    tag = "catalog",
    params(
        ("norad_id" = Option<u32>, Query, description = "Exact NORAD catalog number"),
        ("name" = Option<String>, Query, description = "Case-insensitive name substring"),
        ("created_at" = Option<String>, Query, description = "Creation date (YYYY-MM-DD)"),
        ("updated_at" = Option<String>, Query, description = "Last update date (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Debris objects in a list envelope", body = [CatalogEntry])
    )
)]
pub async fn list_debris(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<ListResponse<CatalogEntry>>> {
    let filter = CatalogFilter {
        object_type: Some(ObjectType::Debris),
        ..query.into()
    };
    let entries = state.storage.query_catalog(&filter)?;
    Ok(Json(ListResponse::new(entries)))
}

#[utoipa::path(
    get,
    path = "/api/debris/stats",
    tag = "catalog",
    responses(
        (status = 200, description = "Debris counts by origin", body = DebrisStats)
    )
)]
pub async fn get_debris_stats(State(state): State<AppState>) -> ApiResult<Json<DebrisStats>> {
    let catalog = state.storage.catalog()?;
    Ok(Json(debris_stats(&catalog)))
}

#[utoipa::path(
    get,
    path = "/api/debris/{norad_id}",
    tag = "catalog",
    params(("norad_id" = u32, Path, description = "NORAD catalog number")),
    responses(
        (status = 200, description = "Debris object", body = CatalogEntry),
        (status = 404, description = "Unknown object or not debris", body = ErrorResponse)
    )
)]
pub async fn get_debris(
    State(state): State<AppState>,
    Path(norad_id): Path<u32>,
) -> ApiResult<Json<CatalogEntry>> {
    let entry = state.storage.find_object(norad_id)?;
    if entry.object_type != ObjectType::Debris {
        return Err(ApiError::NotFound("debris_not_found"));
    }
    Ok(Json(entry))
}
