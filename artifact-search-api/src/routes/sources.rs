use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{domain::models::AppSource, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(sources))
}

#[derive(Debug, Serialize)]
struct SourcesResponse {
    configured: Vec<AppSource>,
    available: Vec<AppSource>,
}

async fn sources(State(app_state): State<AppState>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        configured: app_state.orchestrator.configured_sources(),
        available: AppSource::all(),
    })
}
