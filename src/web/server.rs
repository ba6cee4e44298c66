use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::jobs::{load_local_catalog, JobContext, JobRunner, ScanTrigger};
use crate::propagation::Sgp4Oracle;
use crate::storage::Storage;

use super::api::cdm as cdm_handlers;
use super::api::collisions as collision_handlers;
use super::api::satellites as catalog_handlers;
use super::api::summary as summary_handlers;
use super::api_doc::ApiDoc;
use super::config::Config;
use super::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Catalog
        .route("/api/satellites", get(catalog_handlers::list_satellites))
        .route(
            "/api/satellites/stats",
            get(catalog_handlers::get_satellite_stats),
        )
        .route(
            "/api/satellites/{norad_id}",
            get(catalog_handlers::get_satellite),
        )
        .route("/api/debris", get(catalog_handlers::list_debris))
        .route("/api/debris/stats", get(catalog_handlers::get_debris_stats))
        .route("/api/debris/{norad_id}", get(catalog_handlers::get_debris))
        // Close approaches
        .route(
            "/api/collision-scan",
            post(collision_handlers::start_collision_scan),
        )
        .route("/api/collision", get(collision_handlers::get_collision))
        .route(
            "/api/top-collision",
            get(collision_handlers::get_top_collisions),
        )
        // CDM
        .route(
            "/api/cdm",
            get(cdm_handlers::list_cdms).post(cdm_handlers::ingest_cdms),
        )
        .route(
            "/api/collision-alerts",
            get(cdm_handlers::list_collision_alerts),
        )
        .route("/api/summary", get(summary_handlers::get_summary))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let storage = Arc::new(Storage::new(config.storage.base_folder.clone()));
    let oracle = Arc::new(Sgp4Oracle::new(config.propagation));
    let trigger = ScanTrigger::new(storage.clone(), oracle, config.scan.clone());

    if let Some(folder) = &config.catalog.tle_folder {
        match load_local_catalog(&storage, folder.clone()) {
            Ok(summary) => log::info!(
                "Loaded local TLEs: {} new, {} updated",
                summary.inserted,
                summary.updated
            ),
            Err(e) => log::warn!("Failed to load local TLEs: {}", e),
        }
    }

    let mut jobs = JobRunner::start(JobContext {
        storage: storage.clone(),
        fetch: config.catalog.fetch.clone(),
        jobs: config.jobs.clone(),
        cdm_policy: config.cdm_alerts,
        trigger: trigger.clone(),
    });

    let state = AppState { storage, trigger };
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    jobs.stop().await;
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
