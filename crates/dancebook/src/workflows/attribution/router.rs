use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use super::domain::SessionId;
use super::selector::{AttributionError, AttributionService};
use super::store::AttributionStore;

/// Router builder exposing the batch entry points and the candidate preview.
pub fn attribution_router<S>(service: Arc<AttributionService<S>>) -> Router
where
    S: AttributionStore + 'static,
{
    Router::new()
        .route("/api/v1/attribution/run", post(run_handler::<S>))
        .route("/api/v1/attribution/rekey", post(rekey_handler::<S>))
        .route(
            "/api/v1/sessions/:session_id/candidate",
            get(candidate_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn run_handler<S>(
    State(service): State<Arc<AttributionService<S>>>,
) -> Response
where
    S: AttributionStore + 'static,
{
    match service.run(Utc::now()) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => internal_error(&error),
    }
}

pub(crate) async fn rekey_handler<S>(
    State(service): State<Arc<AttributionService<S>>>,
) -> Response
where
    S: AttributionStore + 'static,
{
    match service.rekey() {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => internal_error(&error),
    }
}

pub(crate) async fn candidate_handler<S>(
    State(service): State<Arc<AttributionService<S>>>,
    Path(session_id): Path<i64>,
) -> Response
where
    S: AttributionStore + 'static,
{
    match service.best_candidate(SessionId(session_id), Utc::now()) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(AttributionError::SessionNotFound(id)) => {
            let payload = json!({ "error": format!("session {id} not found") });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => internal_error(&error),
    }
}

fn internal_error(error: &dyn std::error::Error) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
