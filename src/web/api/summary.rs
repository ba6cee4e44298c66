use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::SystemSummary;
use crate::web::api::error::ApiResult;
use crate::web::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: SystemSummary,
    pub collision_scan_running: bool,
}

#[utoipa::path(
    get,
    path = "/api/summary",
    tag = "summary",
    responses(
        (status = 200, description = "System overview", body = SummaryResponse)
    )
)]
pub async fn get_summary(State(state): State<AppState>) -> ApiResult<Json<SummaryResponse>> {
    Ok(Json(SummaryResponse {
        summary: state.storage.summary()?,
        collision_scan_running: state.trigger.is_running(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::api::testing::{cleanup, entry, state};

    #[tokio::test]
    async fn summarises_an_empty_and_a_seeded_store() {
        let state = state();

        let Json(empty) = get_summary(State(state.clone())).await.unwrap();
        assert_eq!(empty.summary.total_satellites, 0);
        assert_eq!(empty.summary.last_tle_fetch_time, None);
        assert!(!empty.collision_scan_running);

        state
            .storage
            .upsert_catalog(vec![entry(25544, "ISS (ZARYA)"), entry(49863, "COSMOS 1408 DEB")])
            .unwrap();
        let Json(seeded) = get_summary(State(state.clone())).await.unwrap();
        assert_eq!(seeded.summary.total_satellites, 2);
        assert_eq!(seeded.summary.total_debris, 1);

        cleanup(&state);
    }
}
