//! sefaz-api — REST API for the status aggregator.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/status?region=SP&environment=production` | Aggregate status |
//! | POST | `/api/v1/status` | Aggregate status, JSON body |
//! | GET | `/api/v1/regions` | Known regions and their endpoints |
//! | GET | `/healthz` | Liveness |
//!
//! `uf` is accepted in place of `region`. Every response uses the
//! `{success, data, error}` envelope.

pub mod handlers;

use axum::Router;
use axum::routing::get;
use sefaz_engine::StatusEngine;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: StatusEngine,
}

/// Build the complete API router.
pub fn build_router(engine: StatusEngine) -> Router {
    let state = ApiState { engine };

    let api_routes = Router::new()
        .route(
            "/status",
            get(handlers::get_status).post(handlers::post_status),
        )
        .route("/regions", get(handlers::list_regions))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}
