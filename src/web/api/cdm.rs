use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::conjunction::{Cdm, CdmAlert};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::api::ListResponse;
use crate::web::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub received: usize,
    pub added: usize,
}

#[utoipa::path(
    get,
    path = "/api/cdm",
    tag = "cdm",
    responses(
        (status = 200, description = "Stored conjunction data messages", body = [Cdm])
    )
)]
pub async fn list_cdms(State(state): State<AppState>) -> ApiResult<Json<ListResponse<Cdm>>> {
    Ok(Json(ListResponse::new(state.storage.cdms()?)))
}

#[utoipa::path(
    post,
    path = "/api/cdm",
    tag = "cdm",
    request_body = [Cdm],
    responses(
        (status = 201, description = "CDMs stored, existing ids replaced", body = IngestResponse),
        (status = 400, description = "Empty batch", body = ErrorResponse)
    )
)]
pub async fn ingest_cdms(
    State(state): State<AppState>,
    Json(cdms): Json<Vec<Cdm>>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    if cdms.is_empty() {
        return Err(ApiError::Validation("no CDMs in request".into()));
    }
    let received = cdms.len();
    let added = state.storage.upsert_cdms(cdms)?;
    log::info!("Ingested {} CDMs ({} new)", received, added);
    Ok((StatusCode::CREATED, Json(IngestResponse { received, added })))
}

#[utoipa::path(
    get,
    path = "/api/collision-alerts",
    tag = "cdm",
    responses(
        (status = 200, description = "Alerts raised from CDMs", body = [CdmAlert])
    )
)]
pub async fn list_collision_alerts(
    State(state): State<AppState>,
) -> ApiResult<Json<ListResponse<CdmAlert>>> {
    Ok(Json(ListResponse::new(state.storage.cdm_alerts()?)))
}
