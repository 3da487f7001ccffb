//! REST API handlers.
//!
//! Status handlers hand raw input to the engine, which validates it. Only
//! invalid input is an HTTP error; remote failures are part of the payload.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::debug;

use sefaz_engine::EngineError;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// Status request, as query string or JSON body.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(alias = "uf")]
    pub region: String,
    #[serde(default)]
    pub environment: Option<String>,
}

// ── Status ─────────────────────────────────────────────────────

/// GET /api/v1/status
pub async fn get_status(
    State(state): State<ApiState>,
    Query(req): Query<StatusRequest>,
) -> impl IntoResponse {
    status(state, req).await
}

/// POST /api/v1/status
pub async fn post_status(
    State(state): State<ApiState>,
    Json(req): Json<StatusRequest>,
) -> impl IntoResponse {
    status(state, req).await
}

async fn status(state: ApiState, req: StatusRequest) -> axum::response::Response {
    match state
        .engine
        .get_status(&req.region, req.environment.as_deref())
        .await
    {
        Ok(aggregate) => ApiResponse::ok(aggregate).into_response(),
        Err(e @ EngineError::InvalidInput(_)) => {
            debug!(region = %req.region, error = %e, "rejected status request");
            error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response()
        }
    }
}

// ── Regions ────────────────────────────────────────────────────

/// GET /api/v1/regions
pub async fn list_regions(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.engine.registry().regions())
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok("ok")
}
