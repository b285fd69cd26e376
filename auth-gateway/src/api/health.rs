use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Readiness report
#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    status: &'static str,
    session_store: &'static str,
    #[serde(skip)]
    status_code: StatusCode,
}

impl IntoResponse for Health {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthy",
    tag = HEALTH_TAG,
    responses(
        (status = 418, description = "The gateway process is alive", body = String)
    )
)]
pub(crate) async fn healthy() -> impl IntoResponse {
    (StatusCode::IM_A_TEAPOT, "I'm alive")
}

/// Readiness check handler
#[utoipa::path(
    get,
    path = "/ready",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Session store is reachable", body = Health),
        (status = 503, description = "Session store is unavailable", body = Health)
    )
)]
pub(crate) async fn ready(State(state): State<AppState>) -> Health {
    if state.health_check().await {
        Health {
            status: "ok",
            session_store: "healthy",
            status_code: StatusCode::OK,
        }
    } else {
        Health {
            status: "error",
            session_store: "unhealthy",
            status_code: StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthy", get(healthy))
        .route("/ready", get(ready))
}
