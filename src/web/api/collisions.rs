use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::conjunction::CloseApproachEvent;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::api::ListResponse;
use crate::web::state::AppState;

const DEFAULT_TOP_LIMIT: usize = 5;

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanStartedResponse {
    pub status: String,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/collision-scan",
    tag = "collisions",
    responses(
        (status = 202, description = "Scan started in the background", body = ScanStartedResponse),
        (status = 409, description = "A scan is already running", body = ErrorResponse)
    )
)]
pub async fn start_collision_scan(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<ScanStartedResponse>)> {
    state.trigger.spawn()?;
    log::info!("Collision scan triggered over HTTP");
    Ok((
        StatusCode::ACCEPTED,
        Json(ScanStartedResponse {
            status: "started".into(),
            message: "Collision scan running in the background".into(),
        }),
    ))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PairQuery {
    pub norad1: Option<u32>,
    pub norad2: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/collision",
    tag = "collisions",
    params(
        ("norad1" = u32, Query, description = "NORAD id of the first object"),
        ("norad2" = u32, Query, description = "NORAD id of the second object")
    ),
    responses(
        (status = 200, description = "Stored approaches of the pair", body = [CloseApproachEvent]),
        (status = 400, description = "Missing NORAD id", body = ErrorResponse)
    )
)]
pub async fn get_collision(
    State(state): State<AppState>,
    Query(query): Query<PairQuery>,
) -> ApiResult<Json<ListResponse<CloseApproachEvent>>> {
    let (Some(norad1), Some(norad2)) = (query.norad1, query.norad2) else {
        return Err(ApiError::Validation(
            "both norad1 and norad2 are required".into(),
        ));
    };
    let events = state.storage.approaches_between(norad1, norad2)?;
    Ok(Json(ListResponse::new(events)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TopQuery {
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/top-collision",
    tag = "collisions",
    params(("limit" = Option<usize>, Query, description = "Number of events (default 5)")),
    responses(
        (status = 200, description = "Closest stored approaches", body = [CloseApproachEvent])
    )
)]
pub async fn get_top_collisions(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> ApiResult<Json<ListResponse<CloseApproachEvent>>> {
    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    let events = state.storage.top_approaches(limit)?;
    Ok(Json(ListResponse::new(events)))
}
